use thiserror::Error;

/// Errors a control plane call can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
  /// The target group does not exist.
  #[error("target group not found: {0}")]
  NotFound(String),

  /// A target group with this name already exists.
  #[error("target group already exists: {0}")]
  AlreadyExists(String),

  /// Account quota for target groups reached.
  #[error("target group quota exceeded: {0}")]
  QuotaExceeded(String),

  /// The request carried invalid field values.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(String),

  /// The resource would carry more tags than allowed.
  #[error("too many tags: {0}")]
  TooManyTags(String),

  /// The same tag key appeared twice in one request.
  #[error("duplicate tag keys: {0}")]
  DuplicateTagKeys(String),

  /// The resource is still referenced by another resource.
  #[error("resource in use: {0}")]
  ResourceInUse(String),

  /// Throttling, timeouts and other transport failures.
  #[error("transient error: {0}")]
  Transient(String),
}

/// How the reconciler reacts to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Retry the same operation later.
  Transient,
  /// The resource is not there. Meaning depends on the operation.
  Absent,
  /// Retrying the same request can never succeed.
  Invalid,
  /// Blocked by an attached dependency.
  InUse,
}

impl ControlPlaneError {
  pub fn class(&self) -> ErrorClass {
    match self {
      ControlPlaneError::Transient(_) => ErrorClass::Transient,
      ControlPlaneError::NotFound(_) => ErrorClass::Absent,
      ControlPlaneError::ResourceInUse(_) => ErrorClass::InUse,
      ControlPlaneError::AlreadyExists(_)
      | ControlPlaneError::QuotaExceeded(_)
      | ControlPlaneError::InvalidConfiguration(_)
      | ControlPlaneError::TooManyTags(_)
      | ControlPlaneError::DuplicateTagKeys(_) => ErrorClass::Invalid,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ControlPlaneError::NotFound(_))
  }

  /// A message that tells the user what to do about the failure.
  pub fn user_message(&self) -> String {
    match self {
      ControlPlaneError::AlreadyExists(name) => {
        format!("Target group name {name} already exists")
      }
      ControlPlaneError::QuotaExceeded(_) => {
        "Target group quota reached. Please increase your quota and try again.".to_string()
      }
      ControlPlaneError::TooManyTags(_) => {
        "Too many tags on target group. You may have 50 tags per resource.".to_string()
      }
      ControlPlaneError::DuplicateTagKeys(_) => {
        "Duplicate tags found. Please remove duplicates and try again.".to_string()
      }
      ControlPlaneError::InvalidConfiguration(detail) => {
        format!("Invalid target group parameters: {detail}")
      }
      other => other.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification() {
    assert_eq!(ControlPlaneError::Transient("x".into()).class(), ErrorClass::Transient);
    assert_eq!(ControlPlaneError::NotFound("x".into()).class(), ErrorClass::Absent);
    assert_eq!(ControlPlaneError::ResourceInUse("x".into()).class(), ErrorClass::InUse);
    for err in [
      ControlPlaneError::AlreadyExists("x".into()),
      ControlPlaneError::QuotaExceeded("x".into()),
      ControlPlaneError::InvalidConfiguration("x".into()),
      ControlPlaneError::TooManyTags("x".into()),
      ControlPlaneError::DuplicateTagKeys("x".into()),
    ] {
      assert_eq!(err.class(), ErrorClass::Invalid, "{err}");
    }
  }

  #[test]
  fn user_messages_are_actionable() {
    let msg = ControlPlaneError::TooManyTags("51".into()).user_message();
    assert!(msg.contains("50 tags"));
    let msg = ControlPlaneError::InvalidConfiguration("timeout must be lower".into()).user_message();
    assert!(msg.contains("timeout must be lower"));
  }
}
