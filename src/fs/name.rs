use crate::fs::error::MutationError;

const MAX_FILENAME_LENGTH: usize = 255;

/// Check that `name` can be used as a single directory entry.
pub fn validate_name(name: &str) -> Result<(), MutationError> {
    if name.is_empty() {
        return Err(MutationError::InvalidName("Empty name".to_string()));
    }

    if name.contains('\0') {
        return Err(MutationError::InvalidName("Name contains NULL character".to_string()));
    }

    if name.contains('/') {
        return Err(MutationError::InvalidName(format!("Name contains '/': {name}")));
    }

    if name == "." || name == ".." {
        return Err(MutationError::InvalidName(name.to_string()));
    }

    if name.len() > MAX_FILENAME_LENGTH {
        return Err(MutationError::NameTooLong(name.len()));
    }

    Ok(())
}
