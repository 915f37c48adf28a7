use poem::Request;
use poem_openapi::{param::Path, payload::Json, ApiResponse, OpenApi};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::{CreateInquiryRequest, InquiryDto, OfferDto, SaveDraftOfferRequest};
use crate::business::OfferWorkflowCoordinator;
use crate::error::AppError;
use crate::security::extract_actor;

pub struct InquiriesApi {
    coordinator: Arc<OfferWorkflowCoordinator>,
}

impl InquiriesApi {
    pub fn new(coordinator: Arc<OfferWorkflowCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[derive(ApiResponse)]
pub enum CreateInquiryResponse {
    #[oai(status = 201)]
    Created(Json<InquiryDto>),
}

#[OpenApi]
impl InquiriesApi {
    #[oai(path = "/inquiries", method = "post")]
    async fn create_inquiry(
        &self,
        req: &Request,
        body: Json<CreateInquiryRequest>,
    ) -> Result<CreateInquiryResponse, poem::Error> {
        let actor = extract_actor(req)?;
        let inquiry = self
            .coordinator
            .create_inquiry(&actor, body.0.into())
            .await
            .map_err(AppError::from)?;
        Ok(CreateInquiryResponse::Created(Json(InquiryDto::new(inquiry, actor.role))))
    }

    #[oai(path = "/inquiries/:id", method = "get")]
    async fn get_inquiry(&self, req: &Request, id: Path<Uuid>) -> Result<Json<InquiryDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let inquiry = self
            .coordinator
            .get_inquiry(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(InquiryDto::new(inquiry, actor.role)))
    }

    /// Replace the content of an editable inquiry
    #[oai(path = "/inquiries/:id", method = "put")]
    async fn update_inquiry(
        &self,
        req: &Request,
        id: Path<Uuid>,
        body: Json<CreateInquiryRequest>,
    ) -> Result<Json<InquiryDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let inquiry = self
            .coordinator
            .update_inquiry(&actor, id.0, body.0.into())
            .await
            .map_err(AppError::from)?;
        Ok(Json(InquiryDto::new(inquiry, actor.role)))
    }

    #[oai(path = "/inquiries/:id/submit", method = "post")]
    async fn submit_inquiry(&self, req: &Request, id: Path<Uuid>) -> Result<Json<InquiryDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let inquiry = self
            .coordinator
            .submit_inquiry(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(InquiryDto::new(inquiry, actor.role)))
    }

    #[oai(path = "/inquiries/:id/review", method = "post")]
    async fn start_review(&self, req: &Request, id: Path<Uuid>) -> Result<Json<InquiryDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let inquiry = self
            .coordinator
            .start_review(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(InquiryDto::new(inquiry, actor.role)))
    }

    #[oai(path = "/inquiries/:id/cancel", method = "post")]
    async fn cancel_inquiry(&self, req: &Request, id: Path<Uuid>) -> Result<Json<InquiryDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let inquiry = self
            .coordinator
            .cancel_inquiry(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(InquiryDto::new(inquiry, actor.role)))
    }

    #[oai(path = "/inquiries/:id/archive", method = "post")]
    async fn archive_inquiry(&self, req: &Request, id: Path<Uuid>) -> Result<Json<InquiryDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let inquiry = self
            .coordinator
            .archive_inquiry(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(InquiryDto::new(inquiry, actor.role)))
    }

    /// Create or replace the inquiry's draft offer
    #[oai(path = "/inquiries/:id/offer", method = "put")]
    async fn save_draft_offer(
        &self,
        req: &Request,
        id: Path<Uuid>,
        body: Json<SaveDraftOfferRequest>,
    ) -> Result<Json<OfferDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let input = body.0.into_input().map_err(AppError::from)?;
        let offer = self
            .coordinator
            .save_draft_offer(&actor, id.0, input)
            .await
            .map_err(AppError::from)?;
        Ok(Json(offer.into()))
    }
}
