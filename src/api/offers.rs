use poem::Request;
use poem_openapi::{
    param::{Path, Query},
    payload::Json,
    OpenApi,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::{
    OfferDraftDto, OfferDto, OfferResponseDto, RequestChangesRequest, RespondToOfferRequest,
};
use crate::business::{OfferEdit, OfferResponse, OfferWorkflowCoordinator};
use crate::error::AppError;
use crate::security::extract_actor;

pub struct OffersApi {
    coordinator: Arc<OfferWorkflowCoordinator>,
}

impl OffersApi {
    pub fn new(coordinator: Arc<OfferWorkflowCoordinator>) -> Self {
        Self { coordinator }
    }
}

/// Edits arrive as a JSON array of `{"op": ..., ...}` objects
fn parse_edits(body: serde_json::Value) -> Result<Vec<OfferEdit>, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::ValidationError(format!("edits {}", e)))
}

#[OpenApi]
impl OffersApi {
    #[oai(path = "/offers/:id", method = "get")]
    async fn get_offer(&self, req: &Request, id: Path<Uuid>) -> Result<Json<OfferDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let offer = self
            .coordinator
            .get_offer(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(offer.into()))
    }

    /// Recompute a draft with edits applied, without saving
    #[oai(path = "/offers/:id/preview", method = "post")]
    async fn preview_offer(
        &self,
        req: &Request,
        id: Path<Uuid>,
        body: Json<serde_json::Value>,
    ) -> Result<Json<OfferDraftDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let edits = parse_edits(body.0)?;
        let draft = self
            .coordinator
            .preview_offer_edits(&actor, id.0, edits)
            .await
            .map_err(AppError::from)?;
        Ok(Json((&draft).into()))
    }

    /// Apply and save edits. Pass `version` to refuse the edits if the draft
    /// changed since it was read.
    #[oai(path = "/offers/:id/edits", method = "post")]
    async fn apply_offer_edits(
        &self,
        req: &Request,
        id: Path<Uuid>,
        version: Query<Option<u64>>,
        body: Json<serde_json::Value>,
    ) -> Result<Json<OfferDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let edits = parse_edits(body.0)?;
        let offer = self
            .coordinator
            .apply_offer_edits(&actor, id.0, version.0, edits)
            .await
            .map_err(AppError::from)?;
        Ok(Json(offer.into()))
    }

    #[oai(path = "/offers/:id/send", method = "post")]
    async fn send_offer(&self, req: &Request, id: Path<Uuid>) -> Result<Json<OfferDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let offer = self
            .coordinator
            .send_offer(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(offer.into()))
    }

    #[oai(path = "/offers/:id/respond", method = "post")]
    async fn respond_to_offer(
        &self,
        req: &Request,
        id: Path<Uuid>,
        body: Json<RespondToOfferRequest>,
    ) -> Result<Json<OfferDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let response = match body.0.response {
            OfferResponseDto::Accept => OfferResponse::Accept,
            OfferResponseDto::Reject => OfferResponse::Reject,
        };
        let offer = self
            .coordinator
            .respond_to_offer(&actor, id.0, response)
            .await
            .map_err(AppError::from)?;
        Ok(Json(offer.into()))
    }

    #[oai(path = "/offers/:id/request-changes", method = "post")]
    async fn request_changes(
        &self,
        req: &Request,
        id: Path<Uuid>,
        body: Json<RequestChangesRequest>,
    ) -> Result<Json<OfferDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let offer = self
            .coordinator
            .request_offer_changes(&actor, id.0, body.0.message)
            .await
            .map_err(AppError::from)?;
        Ok(Json(offer.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_edits() {
        let edits = parse_edits(json!([
            {"op": "set_fee_percentage", "percentage": "15"},
            {"op": "set_space_size", "index": 0, "allocated_size_m2": "40"},
            {"op": "set_service_pricing", "index": 1, "pricing": {"pricing_mode": "fixed", "fixed_price": 8000}}
        ]))
        .unwrap();
        assert_eq!(edits.len(), 3);
        assert!(matches!(edits[1], OfferEdit::SetSpaceSize { index: 0, .. }));
    }

    #[test]
    fn test_parse_edits_rejects_unknown_op() {
        let err = parse_edits(json!([{"op": "set_discount", "amount": 100}])).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
