use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Currency, Transaction, TransactionStatus};
use crate::error::AppError;
use crate::validation::{
    self, ValidationError, ACCOUNT_MAX_LEN, IP_ADDRESS_MAX_LEN, LOCATION_MAX_LEN, TAG_MAX_LEN,
    TRANSACTION_ID_MAX_LEN,
};
use crate::AppState;

pub const SAVED_MESSAGE: &str = "Transaction saved successfully.";

/// Inbound payload. Any client-sent `timestamp` is ignored; the server stamps it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub transaction_id: String,
    pub currency: String,
    pub amount: BigDecimal,
    pub sender_account: String,
    pub receiver_account: String,
    pub transaction_type: Option<String>,
    pub channel: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
}

impl TransactionRequest {
    /// Field-level checks only. Amount sign and self-transfers are left to the
    /// screening pipeline so they are recorded as FAILED.
    pub fn into_transaction(self) -> Result<Transaction, ValidationError> {
        let transaction_id =
            validation::validate_identifier("transactionId", &self.transaction_id, TRANSACTION_ID_MAX_LEN)?;
        validation::validate_currency(&self.currency)?;
        let currency = validation::sanitize_string(&self.currency)
            .parse::<Currency>()
            .map_err(|e| ValidationError::new("currency", e))?;
        let sender_account =
            validation::validate_identifier("senderAccount", &self.sender_account, ACCOUNT_MAX_LEN)?;
        let receiver_account = validation::validate_identifier(
            "receiverAccount",
            &self.receiver_account,
            ACCOUNT_MAX_LEN,
        )?;

        let mut tx = Transaction::new(
            transaction_id,
            currency,
            self.amount,
            sender_account,
            receiver_account,
        );
        tx.transaction_type = validation::validate_optional(
            "transactionType",
            self.transaction_type.as_deref(),
            TAG_MAX_LEN,
        )?;
        tx.channel = validation::validate_optional("channel", self.channel.as_deref(), TAG_MAX_LEN)?;
        tx.ip_address =
            validation::validate_optional("ipAddress", self.ip_address.as_deref(), IP_ADDRESS_MAX_LEN)?;
        tx.location =
            validation::validate_optional("location", self.location.as_deref(), LOCATION_MAX_LEN)?;

        Ok(tx)
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub message: String,
    pub transaction: Transaction,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let tx = request.into_transaction()?;

    let processed = state.processor.process(tx).await?;

    Ok(Json(TransactionResponse {
        message: format!("{} {}", SAVED_MESSAGE, processed.summary()),
        transaction: processed.transaction,
    }))
}

pub async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.store.find_all().await?))
}

pub async fn list_fraud_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.store.find_fraud_flagged().await?))
}

pub async fn list_successful(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    list_by_status(&state, TransactionStatus::Success).await
}

pub async fn list_failed(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    list_by_status(&state, TransactionStatus::Failed).await
}

pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    list_by_status(&state, TransactionStatus::Pending).await
}

async fn list_by_status(
    state: &AppState,
    status: TransactionStatus,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.store.find_by_status(status).await?))
}
