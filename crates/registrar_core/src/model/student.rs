//! Student aggregate.
//!
//! # Responsibility
//! - Define the canonical student document and its reduced projection.
//! - Define create (`NewStudent`) and patch (`StudentPatch`) inputs.
//!
//! # Invariants
//! - `id` is generated once and never reused for another student.
//! - `student_code` is unique across the collection (enforced by storage).
//! - `course_refs` is a set kept in insertion order; only the enrollment
//!   manager mutates it.

use super::course::CourseId;
use super::{require_text, validate_email, validate_iso_date, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a student document.
pub type StudentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Address category, mirroring the values accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    Permanent,
    Correspondence,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Address {
    #[serde(rename = "type")]
    pub kind: AddressType,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl Address {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("address.street", &self.street)?;
        require_text("address.city", &self.city)?;
        require_text("address.state", &self.state)?;
        require_text("address.zipCode", &self.zip_code)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Parents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
}

/// Canonical student document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub gender: Gender,
    pub student_code: String,
    pub addresses: Vec<Address>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub parents: Option<Parents>,
    /// Courses this student believes they are enrolled in.
    pub course_refs: Vec<CourseId>,
    /// Epoch milliseconds, assigned by storage.
    pub created_at: i64,
    /// Epoch milliseconds, assigned by storage.
    pub updated_at: i64,
}

impl Student {
    /// Builds a fresh document from create input with a generated ID and an
    /// empty reference set.
    pub fn from_new(input: NewStudent) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            date_of_birth: input.date_of_birth,
            gender: input.gender,
            student_code: input.student_code,
            addresses: input.addresses,
            email: input.email,
            mobile: input.mobile,
            parents: input.parents,
            course_refs: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("studentCode", &self.student_code)?;
        validate_iso_date(&self.date_of_birth)?;
        for address in &self.addresses {
            address.validate()?;
        }
        if let Some(email) = self.email.as_deref() {
            validate_email(email)?;
        }
        Ok(())
    }

    pub fn is_enrolled_in(&self, course_id: CourseId) -> bool {
        self.course_refs.contains(&course_id)
    }

    /// Reduced projection used when listing a course's students.
    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            id: self.id,
            name: self.name.clone(),
            student_code: self.student_code.clone(),
            email: self.email.clone(),
        }
    }
}

/// Student projection limited to `name`, `studentCode` and `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: StudentId,
    pub name: String,
    pub student_code: String,
    pub email: Option<String>,
}

/// Create input for a student. Carries no reference fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewStudent {
    pub name: String,
    #[serde(alias = "dob")]
    pub date_of_birth: String,
    pub gender: Gender,
    pub student_code: String,
    /// Required on input; may be an empty list.
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub parents: Option<Parents>,
}

/// Partial update for a student.
///
/// Only contact data, addresses and parents can change after creation;
/// `addresses` replaces the whole list when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub addresses: Option<Vec<Address>>,
    #[serde(default)]
    pub parents: Option<Parents>,
}

impl StudentPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = self.email.as_deref() {
            validate_email(email)?;
        }
        if let Some(addresses) = self.addresses.as_ref() {
            for address in addresses {
                address.validate()?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.mobile.is_none()
            && self.addresses.is_none()
            && self.parents.is_none()
    }

    /// Applies present fields onto `student`, leaving references untouched.
    pub fn apply_to(&self, student: &mut Student) {
        if let Some(email) = self.email.as_ref() {
            student.email = Some(email.clone());
        }
        if let Some(mobile) = self.mobile.as_ref() {
            student.mobile = Some(mobile.clone());
        }
        if let Some(addresses) = self.addresses.as_ref() {
            student.addresses = addresses.clone();
        }
        if let Some(parents) = self.parents.as_ref() {
            student.parents = Some(parents.clone());
        }
    }
}
