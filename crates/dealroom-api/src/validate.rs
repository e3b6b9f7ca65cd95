//! Input checks shared by the handlers. Every check runs before any write.

use uuid::Uuid;

use dealroom_types::api::{BuyerContact, MAX_PAGE_SIZE, PageQuery};

use crate::error::{ApiError, ApiResult};

pub const MAX_MESSAGE_CHARS: usize = 5000;
pub const MAX_SHORT_CHARS: usize = 200;
pub const MAX_BULK_IDS: usize = 100;

/// Trimmed, non-empty, at most `max` characters.
pub fn required(field: &str, value: &str, max: usize) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::bad_request(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`required`] but blank input becomes `None`.
pub fn optional(field: &str, value: Option<&str>, max: usize) -> ApiResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required(field, v, max).map(Some),
    }
}

pub fn email(value: &str) -> ApiResult<String> {
    let email = required("email", value, 254)?.to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, host)) => {
            !local.is_empty() && host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
        }
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(ApiError::bad_request("email is not a valid address"));
    }
    Ok(email)
}

pub fn contact(contact: &BuyerContact) -> ApiResult<BuyerContact> {
    Ok(BuyerContact {
        name: required("contact.name", &contact.name, 100)?,
        email: email(&contact.email)?,
        phone: optional("contact.phone", contact.phone.as_deref(), 40)?,
        company: optional("contact.company", contact.company.as_deref(), MAX_SHORT_CHARS)?,
    })
}

pub fn page(query: PageQuery) -> ApiResult<PageQuery> {
    if query.page == 0 {
        return Err(ApiError::bad_request("page starts at 1"));
    }
    if query.limit == 0 || query.limit > MAX_PAGE_SIZE {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(query)
}

/// Identifiers arrive as path strings; anything unparsable cannot name an
/// existing entity.
pub fn path_id(entity: &str, raw: &str) -> ApiResult<Uuid> {
    raw.parse().map_err(|_| ApiError::not_found(entity, raw))
}

/// Non-empty, de-duplicated (first occurrence wins), bounded id list.
pub fn bulk_ids(ids: &[Uuid]) -> ApiResult<Vec<Uuid>> {
    if ids.is_empty() {
        return Err(ApiError::bad_request("at least one id is required"));
    }
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    if unique.len() > MAX_BULK_IDS {
        return Err(ApiError::bad_request(format!(
            "at most {} ids per bulk request",
            MAX_BULK_IDS
        )));
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_bounds() {
        assert_eq!(required("f", "  hi ", 5).unwrap(), "hi");
        assert!(matches!(required("f", "   ", 5), Err(ApiError::BadRequest(_))));
        assert!(required("f", "toolong", 3).is_err());
        assert_eq!(optional("f", Some("  "), 3).unwrap(), None);
    }

    #[test]
    fn email_shape() {
        assert_eq!(email(" Jane@Example.com ").unwrap(), "jane@example.com");
        assert!(email("jane@localhost").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("jane example@x.com").is_err());
    }

    #[test]
    fn bulk_ids_dedupe() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(bulk_ids(&[a, b, a]).unwrap(), vec![a, b]);
        assert!(bulk_ids(&[]).is_err());
    }

    #[test]
    fn malformed_path_id_is_not_found() {
        assert!(matches!(path_id("inquiry", "nope"), Err(ApiError::NotFound(_))));
    }
}
