pub mod provider;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use rally_db::models::{AttemptAdded, PaymentUpdate};
use rally_types::api::{
    InitializePaymentRequest, InitializePaymentResponse, PaymentConfigResponse, PaymentSummary,
    VerifyPaymentRequest,
};
use rally_types::models::{ParticipateSubmission, PaymentStatus};

use crate::error::{ApiError, Payload};
use crate::middleware::{Claims, is_admin};
use crate::state::{AppState, db_task};

use self::provider::InitializeTransaction;

/// POST /payments/initialize: start a provider transaction for a submission.
pub async fn initialize_payment(
    State(state): State<AppState>,
    Payload(req): Payload<InitializePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = req.submission_id.to_string();
    let (submission, settings) = db_task(&state, move |db| {
        let submission = db
            .get_participate(&sid)?
            .ok_or_else(|| ApiError::not_found("Submission"))?
            .into_model();
        Ok((submission, db.get_payment_settings()?.into_model()))
    })
    .await?;

    if submission.payment_status == PaymentStatus::Paid {
        return Err(ApiError::invalid("Submission has already been paid"));
    }
    if !settings.enabled {
        return Err(ApiError::invalid("Payments are currently disabled"));
    }
    let amount = req.amount.unwrap_or(settings.amount);
    if amount <= 0 {
        return Err(ApiError::invalid("Amount must be positive"));
    }
    if amount < settings.amount {
        return Err(ApiError::invalid(format!(
            "Amount must be at least {} {}",
            settings.amount, settings.currency
        )));
    }

    let txn = InitializeTransaction {
        reference: format!("RLY-{}", Uuid::new_v4().simple()),
        email: submission.email.clone(),
        amount,
        currency: settings.currency,
        callback_url: state.payment_callback_url.clone(),
        submission_id: submission.id,
    };
    let initialized = state.payments.initialize(&txn).await?;

    let sid = submission.id.to_string();
    let reference = initialized.reference.clone();
    let attached =
        db_task(&state, move |db| Ok(db.add_payment_attempt(&sid, &reference, amount)?)).await?;
    match attached {
        AttemptAdded::Added => {}
        AttemptAdded::AlreadyPaid => {
            warn!("Submission {} was paid while initializing {}", submission.id, initialized.reference);
            return Err(ApiError::invalid("Submission has already been paid"));
        }
        AttemptAdded::NoSuchSubmission => {
            warn!("Submission {} deleted while initializing {}", submission.id, initialized.reference);
            return Err(ApiError::not_found("Submission"));
        }
    }

    info!("Payment {} initialized for submission {}", initialized.reference, submission.id);
    Ok(Json(InitializePaymentResponse {
        reference: initialized.reference,
        authorization_url: initialized.authorization_url,
        access_code: initialized.access_code,
    }))
}

/// POST /payments/verify: ask the provider for the outcome and record it.
/// If the provider cannot be reached the stored status is left untouched.
pub async fn verify_payment(
    State(state): State<AppState>,
    Payload(req): Payload<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reference = req.reference.trim().to_string();
    if reference.is_empty() {
        return Err(ApiError::missing_fields(&["reference"]));
    }

    let lookup = reference.clone();
    let attempt = db_task(&state, move |db| {
        db.get_payment_attempt(&lookup)?
            .ok_or_else(|| ApiError::not_found("Payment"))
    })
    .await?;

    let verified = state.payments.verify(&reference).await?;
    let status = match (verified.success, verified.amount) {
        (true, Some(charged)) if charged >= attempt.amount => PaymentStatus::Paid,
        (true, charged) => {
            warn!(
                "Payment {} underpaid: provider charged {:?}, expected {}",
                reference, charged, attempt.amount
            );
            PaymentStatus::Failed
        }
        (false, _) => PaymentStatus::Failed,
    };
    // Only a settled payment's amount is worth keeping.
    let amount = verified.amount.filter(|_| status == PaymentStatus::Paid);

    let submission = db_task(&state, move |db| {
        let outcome = db.record_payment_result(
            &reference,
            status,
            amount,
            verified.customer_id.as_deref(),
        )?;
        match outcome {
            PaymentUpdate::Recorded => {
                info!("Payment {} marked {} (provider: {})", reference, status, verified.status)
            }
            PaymentUpdate::AlreadyPaid => {
                info!("Payment {} already paid; provider said {}", reference, verified.status)
            }
            PaymentUpdate::NoSuchReference => return Err(ApiError::not_found("Payment")),
        }
        db.get_participate_by_reference(&reference)?
            .map(|row| row.into_model())
            .ok_or_else(|| ApiError::not_found("Payment"))
    })
    .await?;

    Ok(Json(summary(submission)?))
}

/// GET /payments/{reference}: visible to the submission's owner and to admins.
pub async fn get_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = db_task(&state, move |db| {
        db.get_participate_by_reference(&reference)?
            .map(|row| row.into_model())
            .ok_or_else(|| ApiError::not_found("Payment"))
    })
    .await?;

    if submission.user_id != Some(claims.sub) && !is_admin(&state, &claims).await? {
        return Err(ApiError::Forbidden("Not your payment".into()));
    }

    Ok(Json(summary(submission)?))
}

/// GET /payments: every submission that has started a payment (admin).
pub async fn list_payments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_payments()?)).await?;
    let payments = rows
        .into_iter()
        .map(|row| summary(row.into_model()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(payments))
}

/// GET /payments/my
pub async fn my_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = db_task(&state, move |db| Ok(db.list_payments_by_user(&uid)?)).await?;
    let payments = rows
        .into_iter()
        .map(|row| summary(row.into_model()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(payments))
}

/// GET /payments/config: what a browser needs to open the provider checkout.
pub async fn payment_config(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let settings = db_task(&state, |db| Ok(db.get_payment_settings()?)).await?.into_model();
    Ok(Json(PaymentConfigResponse {
        public_key: state.payment_public_key.clone(),
        amount: settings.amount,
        currency: settings.currency,
        enabled: settings.enabled,
    }))
}

fn summary(submission: ParticipateSubmission) -> Result<PaymentSummary, ApiError> {
    let reference = submission.payment_reference.ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!("submission {} has no payment reference", submission.id))
    })?;

    Ok(PaymentSummary {
        submission_id: submission.id,
        user_id: submission.user_id,
        full_name: submission.full_name,
        email: submission.email,
        reference,
        payment_status: submission.payment_status,
        amount_paid: submission.amount_paid,
        provider_customer_id: submission.provider_customer_id,
    })
}
