use poem::Request;
use uuid::Uuid;

use crate::business::{Actor, ActorRole};
use crate::error::AppError;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

/// Identity set by the upstream auth proxy
pub fn extract_actor(req: &Request) -> Result<Actor, AppError> {
    let id = req
        .header(ACTOR_ID_HEADER)
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or(AppError::Unauthorized)?;
    let role = req
        .header(ACTOR_ROLE_HEADER)
        .and_then(|s| s.parse::<ActorRole>().ok())
        .ok_or(AppError::Unauthorized)?;
    Ok(Actor::new(id, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use poem::Request;

    #[test]
    fn test_extract_actor_success() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header(ACTOR_ID_HEADER, id.to_string())
            .header(ACTOR_ROLE_HEADER, "Operator")
            .finish();

        let actor = extract_actor(&req).unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, ActorRole::Operator);
    }

    #[test]
    fn test_extract_actor_missing() {
        let req = Request::builder().finish();

        let result = extract_actor(&req);
        assert!(result.is_err());
        match result.unwrap_err() {
            AppError::Unauthorized => {}
            _ => panic!("Expected Unauthorized error"),
        }
    }

    #[test]
    fn test_extract_actor_rejects_bad_values() {
        let req = Request::builder()
            .header(ACTOR_ID_HEADER, "not-a-uuid")
            .header(ACTOR_ROLE_HEADER, "requester")
            .finish();
        assert!(matches!(extract_actor(&req), Err(AppError::Unauthorized)));

        let req = Request::builder()
            .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .header(ACTOR_ROLE_HEADER, "superuser")
            .finish();
        assert!(matches!(extract_actor(&req), Err(AppError::Unauthorized)));
    }
}
