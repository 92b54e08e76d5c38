use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Method, Request, RequestData};

// Requests

#[derive(Default, Debug, Clone, Serialize)]
pub struct CreateLinkToken;

impl Request for CreateLinkToken {
    type Data = ();
    type Response = LinkTokenResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/plaid/link/token/create".into()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePublicToken {
    public_token: String,
}

impl ExchangePublicToken {
    pub fn new(public_token: impl Into<String>) -> Self {
        Self {
            public_token: public_token.into(),
        }
    }
}

impl Request for ExchangePublicToken {
    type Data = Self;
    type Response = serde_json::Value;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/plaid/item/public_token/exchange".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

#[derive(Default, Debug, Clone, Serialize)]
pub struct GetPlaidStatus;

impl Request for GetPlaidStatus {
    type Data = ();
    type Response = PlaidStatus;

    fn endpoint(&self) -> Cow<'_, str> {
        "/plaid/status".into()
    }
}

#[derive(Default, Debug, Clone, Serialize)]
pub struct SyncPlaid;

impl Request for SyncPlaid {
    type Data = ();
    type Response = serde_json::Value;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/plaid/sync".into()
    }
}

// Responses

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    pub link_token: String,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaidStatus {
    #[serde(default)]
    pub has_item: bool,
}
