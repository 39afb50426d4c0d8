use thiserror::Error;

use crate::model::ids::AvatarId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("student name cannot be empty")]
    EmptyName,

    #[error("course cannot be empty")]
    EmptyCourse,
}

/// Who is running the session, captured once at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentIdentity {
    name: String,
    course: String,
    avatar: AvatarId,
}

impl StudentIdentity {
    /// Creates a new identity, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if name or course is empty after trimming.
    pub fn new(
        name: impl Into<String>,
        course: impl Into<String>,
        avatar: AvatarId,
    ) -> Result<Self, IdentityError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        let course = course.into().trim().to_owned();
        if course.is_empty() {
            return Err(IdentityError::EmptyCourse);
        }
        Ok(Self {
            name,
            course,
            avatar,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn course(&self) -> &str {
        &self.course
    }

    #[must_use]
    pub fn avatar(&self) -> AvatarId {
        self.avatar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar() -> AvatarId {
        AvatarId::new(1).unwrap()
    }

    #[test]
    fn identity_trims_and_keeps_fields() {
        let id = StudentIdentity::new("  Valentina Rojas ", "3C TP", avatar()).unwrap();
        assert_eq!(id.name(), "Valentina Rojas");
        assert_eq!(id.course(), "3C TP");
        assert_eq!(id.avatar().value(), 1);
    }

    #[test]
    fn identity_rejects_blank_fields() {
        assert_eq!(
            StudentIdentity::new("  ", "3C", avatar()).unwrap_err(),
            IdentityError::EmptyName
        );
        assert_eq!(
            StudentIdentity::new("Ana", "\t", avatar()).unwrap_err(),
            IdentityError::EmptyCourse
        );
    }
}
