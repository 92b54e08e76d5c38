use sanddollar_api::{Client, DEFAULT_BASE_URL, Request, SanddollarApiError};
use secrecy::SecretString;

#[tokio::main]
pub async fn main() -> Result<(), SanddollarApiError> {
    let client = Client::with_token(DEFAULT_BASE_URL, SecretString::from("api_token"));

    let req = Request::ai_budget().snapshot();

    let _res = client.send(req).await?;
    Ok(())
}
