//! Smoke probes against a running deployment.
//!
//! These exercise the external contract only: no service keys, no
//! webhook secret. A probe passes when the deployment rejects the
//! request the way the contract says it must.

use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// How many rapid submissions we fire before concluding the rate limit
/// never trips. The checkout limiter allows ~10/minute, so 30 is far
/// past any legitimate burst.
const RATE_LIMIT_ATTEMPTS: usize = 30;

/// A probe that did not observe the expected rejection.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{probe}: expected {expected}, observed {observed}")]
    Unexpected {
        probe: &'static str,
        expected: String,
        observed: String,
    },
}

/// Probe the checkout endpoint: unknown products are rejected, and the
/// per-minute rate threshold produces 429s.
///
/// # Errors
///
/// Returns a [`ProbeError`] naming the first failed expectation.
pub async fn checkout(base_url: &str) -> Result<(), ProbeError> {
    let client = reqwest::Client::new();
    let url = format!("{}/checkout", base_url.trim_end_matches('/'));

    // An otherwise well-formed submission referencing a product that
    // cannot exist. The deployment must reject it, not create a session.
    let unknown_product = probe_body(Uuid::new_v4());

    let response = client.post(&url).json(&unknown_product).send().await?;
    let status = response.status();
    if !status.is_client_error() || status.as_u16() == 429 {
        return Err(ProbeError::Unexpected {
            probe: "checkout/unknown-product",
            expected: "a 4xx rejection".to_string(),
            observed: status.to_string(),
        });
    }
    tracing::info!(status = %status, "unknown-product probe rejected as expected");

    // Hammer the endpoint until the limiter trips.
    for attempt in 1..=RATE_LIMIT_ATTEMPTS {
        let response = client.post(&url).json(&unknown_product).send().await?;
        if response.status().as_u16() == 429 {
            tracing::info!(attempt, "rate limit tripped as expected");
            return Ok(());
        }
    }

    Err(ProbeError::Unexpected {
        probe: "checkout/rate-limit",
        expected: format!("a 429 within {RATE_LIMIT_ATTEMPTS} rapid requests"),
        observed: "no 429".to_string(),
    })
}

/// Probe the webhook receiver: a bad signature earns 401, a GET earns 405.
///
/// # Errors
///
/// Returns a [`ProbeError`] naming the first failed expectation.
pub async fn webhook(base_url: &str) -> Result<(), ProbeError> {
    let client = reqwest::Client::new();
    let url = format!("{}/webhooks/payment", base_url.trim_end_matches('/'));

    let body = json!({ "type": "checkout.session.completed", "session_id": "cs_probe" });

    let response = client
        .post(&url)
        .header("x-webhook-signature", "deadbeef")
        .json(&body)
        .send()
        .await?;
    if response.status().as_u16() != 401 {
        return Err(ProbeError::Unexpected {
            probe: "webhook/invalid-signature",
            expected: "401".to_string(),
            observed: response.status().to_string(),
        });
    }
    tracing::info!("invalid-signature probe rejected as expected");

    let response = client.get(&url).send().await?;
    if response.status().as_u16() != 405 {
        return Err(ProbeError::Unexpected {
            probe: "webhook/wrong-method",
            expected: "405".to_string(),
            observed: response.status().to_string(),
        });
    }
    tracing::info!("wrong-method probe rejected as expected");

    Ok(())
}

/// A syntactically valid submission for a product id that does not exist.
fn probe_body(product_id: Uuid) -> serde_json::Value {
    json!({
        "items": [{
            "product_id": product_id,
            "variant_id": Uuid::new_v4(),
            "quantity": 1,
            "unit_price": "10.00"
        }],
        "contact": {
            "email": "probe@haberdash.dev",
            "first_name": "Smoke",
            "last_name": "Probe",
            "address_line1": "1 Probe Way",
            "city": "Kalamazoo",
            "state": "MI",
            "postal_code": "49007",
            "country": "US"
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_body_is_a_complete_submission() {
        let body = probe_body(Uuid::nil());
        assert!(body["items"][0]["product_id"].is_string());
        assert_eq!(body["contact"]["email"], "probe@haberdash.dev");
    }
}
