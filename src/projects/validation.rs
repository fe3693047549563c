use crate::error::{Error, Result};

const MIN_PROJECT_ID_LEN: usize = 3;
const MAX_PROJECT_ID_LEN: usize = 20;
const MAX_PROJECT_NAME_LEN: usize = 20;

fn is_valid_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Validates the user-supplied portion of a project id, before namespacing.
pub fn validate_project_id(id: &str) -> Result<()> {
    let len = id.chars().count();
    if len < MIN_PROJECT_ID_LEN {
        return Err(Error::validation(format!(
            "Project id must be at least {MIN_PROJECT_ID_LEN} characters"
        )));
    }
    if len > MAX_PROJECT_ID_LEN {
        return Err(Error::validation(format!(
            "Project id cannot exceed {MAX_PROJECT_ID_LEN} characters"
        )));
    }
    if !id.chars().all(is_valid_id_char) {
        return Err(Error::validation(
            "Project id can only contain alphanumeric characters, hyphens, and underscores",
        ));
    }
    Ok(())
}

pub fn validate_project_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("Project name cannot be empty"));
    }
    if name.chars().count() > MAX_PROJECT_NAME_LEN {
        return Err(Error::validation(format!(
            "Project name cannot exceed {MAX_PROJECT_NAME_LEN} characters"
        )));
    }
    Ok(())
}
