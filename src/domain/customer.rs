use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: String, age: u32, gender: Gender, phone: String, address: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            age,
            gender,
            phone,
            address,
            created_at: Utc::now(),
        }
    }

    /// Check the field-level rules shared by create and update.
    pub fn validate(&self) -> Result<(), CustomerError> {
        if self.name.trim().is_empty() {
            return Err(CustomerError::Blank("name"));
        }
        if self.phone.trim().is_empty() {
            return Err(CustomerError::Blank("phone"));
        }
        if self.address.trim().is_empty() {
            return Err(CustomerError::Blank("address"));
        }
        if self.age == 0 {
            return Err(CustomerError::NonPositiveAge);
        }
        Ok(())
    }

    /// Apply a partial update. The id and creation time never change.
    pub fn apply(&mut self, patch: CustomerPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
    }
}

/// Fields a caller may change on an existing customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerError {
    Blank(&'static str),
    NonPositiveAge,
}

impl std::fmt::Display for CustomerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerError::Blank(field) => write!(f, "{} must not be blank", field),
            CustomerError::NonPositiveAge => write!(f, "age must be a positive integer"),
        }
    }
}

impl std::error::Error for CustomerError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Customer {
        Customer::new(
            "Asha Rao".into(),
            34,
            Gender::Female,
            "555-0100".into(),
            "12 Lake Road".into(),
        )
    }

    #[test]
    fn test_gender_parsing_is_case_insensitive() {
        assert_eq!(Gender::from_str("MALE"), Some(Gender::Male));
        assert_eq!(Gender::from_str("female"), Some(Gender::Female));
        assert_eq!(Gender::from_str("Other"), Some(Gender::Other));
        assert_eq!(Gender::from_str("unknown"), None);
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut customer = sample();
        customer.name = "   ".into();
        assert_eq!(customer.validate(), Err(CustomerError::Blank("name")));

        let mut customer = sample();
        customer.address = String::new();
        assert_eq!(customer.validate(), Err(CustomerError::Blank("address")));
    }

    #[test]
    fn test_validate_rejects_zero_age() {
        let mut customer = sample();
        customer.age = 0;
        assert_eq!(customer.validate(), Err(CustomerError::NonPositiveAge));
    }

    #[test]
    fn test_apply_patch_keeps_identity() {
        let mut customer = sample();
        let id = customer.id;
        customer.apply(CustomerPatch {
            phone: Some("555-0199".into()),
            age: Some(35),
            ..Default::default()
        });

        assert_eq!(customer.id, id);
        assert_eq!(customer.phone, "555-0199");
        assert_eq!(customer.age, 35);
        assert_eq!(customer.name, "Asha Rao");
    }
}
