//! Team members and their account details.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub role: Role,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// Date of birth as entered, `YYYY-MM-DD`.
    #[serde(default)]
    pub dob: String,
    /// Plaintext login credential.
    #[serde(default)]
    pub password: Option<String>,
}

impl Employee {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeDraft {
    pub name: String,
    pub role: Role,
    pub email: String,
    pub phone: String,
    pub dob: String,
    /// Required on creation. On edit, empty keeps the stored password.
    pub password: Option<String>,
}

impl EmployeeDraft {
    pub fn from_employee(employee: &Employee) -> Self {
        EmployeeDraft {
            name: employee.name.clone(),
            role: employee.role,
            email: employee.email.clone(),
            phone: employee.phone.clone(),
            dob: employee.dob.clone(),
            password: None,
        }
    }

    pub fn validate(&self, creating: bool) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField("name"));
        }
        if self.email.trim().is_empty() {
            return Err(Error::MissingField("email"));
        }
        if creating && self.password().is_none() {
            return Err(Error::MissingField("password"));
        }
        Ok(())
    }

    /// The supplied password, treating blank input as absent.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_employee_needs_password() {
        let draft = EmployeeDraft {
            name: "Lan".into(),
            email: "lan@company.com".into(),
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(draft.validate(true), Err(Error::MissingField("password"))));
        assert!(draft.validate(false).is_ok());
    }

    #[test]
    fn name_and_email_required() {
        let draft = EmployeeDraft { name: " ".into(), ..Default::default() };
        assert!(matches!(draft.validate(false), Err(Error::MissingField("name"))));
        let draft = EmployeeDraft { name: "Lan".into(), ..Default::default() };
        assert!(matches!(draft.validate(false), Err(Error::MissingField("email"))));
    }
}
