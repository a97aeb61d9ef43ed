//! # Wire Protocol
//!
//! One JSON object per line in each direction.
//!
//! ```text
//! → {"id":1,"command":"add_item","itemId":"1","name":"Soap","unitPrice":10000,"quantity":2}
//! ← {"id":1,"ok":true,"data":{"phase":"idle","items":[...],"totals":{...},"inFlight":false}}
//!
//! → {"id":2,"command":"enter_cash","amountReceived":100}
//! ← {"id":2,"ok":false,"error":{"code":"INVALID_TRANSITION","message":"Cannot enter cash while idle"}}
//! ```
//!
//! `id` is echoed back untouched so the caller can match replies to
//! requests; replies may arrive out of order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use till_core::Money;

use crate::error::ApiError;

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "command",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    GetCart,
    AddItem {
        item_id: String,
        name: String,
        unit_price: Money,
        #[serde(default)]
        quantity: Option<i64>,
    },
    UpdateQuantity {
        item_id: String,
        quantity: i64,
    },
    RemoveItem {
        item_id: String,
    },
    ClearCart,
    BeginCheckout,
    SubmitCustomer {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        phone: Option<String>,
    },
    SkipCustomer,
    SelectMethod {
        method: String,
    },
    EnterCash {
        amount_received: Money,
    },
    CompletePayment,
    Cancel,
    StartNext,
    GetReceipt,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetCart => "get_cart",
            Command::AddItem { .. } => "add_item",
            Command::UpdateQuantity { .. } => "update_quantity",
            Command::RemoveItem { .. } => "remove_item",
            Command::ClearCart => "clear_cart",
            Command::BeginCheckout => "begin_checkout",
            Command::SubmitCustomer { .. } => "submit_customer",
            Command::SkipCustomer => "skip_customer",
            Command::SelectMethod { .. } => "select_method",
            Command::EnterCash { .. } => "enter_cash",
            Command::CompletePayment => "complete_payment",
            Command::Cancel => "cancel",
            Command::StartNext => "start_next",
            Command::GetReceipt => "get_receipt",
        }
    }
}

/// A request line: the caller's correlation id plus the command, or the
/// reason the command could not be decoded.
#[derive(Debug)]
pub struct Request {
    pub id: Option<Value>,
    pub command: Result<Command, ApiError>,
}

impl Request {
    pub fn parse(line: &str) -> Request {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Request {
                    id: None,
                    command: Err(ApiError::invalid_request(format!("Malformed JSON: {}", e))),
                }
            }
        };

        let id = value.get("id").cloned();
        let command = serde_json::from_value(value)
            .map_err(|e| ApiError::invalid_request(format!("Invalid command: {}", e)));

        Request { id, command }
    }
}

/// A reply line.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Reply {
    pub fn success(id: Option<Value>, data: Value) -> Self {
        Reply {
            id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: ApiError) -> Self {
        Reply {
            id,
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn from_result(id: Option<Value>, result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Reply::success(id, data),
            Err(error) => Reply::failure(id, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_parse_add_item() {
        let request = Request::parse(
            r#"{"id":7,"command":"add_item","itemId":"1","name":"Soap","unitPrice":10000,"quantity":2}"#,
        );
        assert_eq!(request.id, Some(json!(7)));
        assert_eq!(
            request.command.unwrap(),
            Command::AddItem {
                item_id: "1".to_string(),
                name: "Soap".to_string(),
                unit_price: Money::from_cents(10_000),
                quantity: Some(2),
            }
        );
    }

    #[test]
    fn test_parse_optional_fields() {
        let request = Request::parse(r#"{"command":"submit_customer","name":"Ana"}"#);
        assert_eq!(request.id, None);
        assert_eq!(
            request.command.unwrap(),
            Command::SubmitCustomer {
                name: Some("Ana".to_string()),
                phone: None,
            }
        );

        let request = Request::parse(r#"{"id":"a","command":"enter_cash","amountReceived":500}"#);
        assert_eq!(
            request.command.unwrap(),
            Command::EnterCash {
                amount_received: Money::from_cents(500)
            }
        );
    }

    #[test]
    fn test_parse_errors_keep_id() {
        let request = Request::parse(r#"{"id":3,"command":"refund"}"#);
        assert_eq!(request.id, Some(json!(3)));
        assert_eq!(request.command.unwrap_err().code, ErrorCode::InvalidRequest);

        let request = Request::parse("not json");
        assert_eq!(request.id, None);
        assert_eq!(request.command.unwrap_err().code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_reply_shape() {
        let ok = serde_json::to_value(Reply::success(Some(json!(1)), json!({"a": 1}))).unwrap();
        assert_eq!(ok, json!({"id": 1, "ok": true, "data": {"a": 1}}));

        let err = Reply::failure(None, ApiError::internal("boom"));
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"]["code"], "INTERNAL");
        assert!(err.get("id").is_none());
    }
}
