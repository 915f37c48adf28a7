use poem::Request;
use poem_openapi::{param::Path, payload::Json, ApiResponse, OpenApi};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::BookingDto;
use crate::business::OfferWorkflowCoordinator;
use crate::error::AppError;
use crate::security::extract_actor;

pub struct BookingsApi {
    coordinator: Arc<OfferWorkflowCoordinator>,
}

impl BookingsApi {
    pub fn new(coordinator: Arc<OfferWorkflowCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[derive(ApiResponse)]
pub enum CreateBookingResponse {
    #[oai(status = 201)]
    Created(Json<BookingDto>),
}

#[OpenApi]
impl BookingsApi {
    /// Book an accepted offer. Repeating the call returns the same booking.
    #[oai(path = "/offers/:id/booking", method = "post")]
    async fn create_booking(
        &self,
        req: &Request,
        id: Path<Uuid>,
    ) -> Result<CreateBookingResponse, poem::Error> {
        let actor = extract_actor(req)?;
        let booking = self
            .coordinator
            .create_booking(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(CreateBookingResponse::Created(Json(booking.into())))
    }

    #[oai(path = "/bookings/:id", method = "get")]
    async fn get_booking(&self, req: &Request, id: Path<Uuid>) -> Result<Json<BookingDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let booking = self
            .coordinator
            .get_booking(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(booking.into()))
    }

    #[oai(path = "/bookings/:id/complete", method = "post")]
    async fn complete_booking(&self, req: &Request, id: Path<Uuid>) -> Result<Json<BookingDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let booking = self
            .coordinator
            .complete_booking(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(booking.into()))
    }

    #[oai(path = "/bookings/:id/cancel", method = "post")]
    async fn cancel_booking(&self, req: &Request, id: Path<Uuid>) -> Result<Json<BookingDto>, poem::Error> {
        let actor = extract_actor(req)?;
        let booking = self
            .coordinator
            .cancel_booking(&actor, id.0)
            .await
            .map_err(AppError::from)?;
        Ok(Json(booking.into()))
    }
}
