use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::MovieFacts,
};

/// Client for the external movie-information service (OMDb wire format).
///
/// Lookups are rate limited and bounded by a short per-request timeout so a
/// slow upstream cannot hold a request open indefinitely.
pub struct OmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OmdbClient {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        timeout_secs: u64,
        rps: u32,
    ) -> Self {
        // Warn once on app load if using mock data
        if api_key.trim().is_empty() {
            tracing::warn!("Using mock movie data - no OMDB_API_KEY provided");
        }

        let limiter =
            Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::new(rps.max(1)).unwrap())));
        Self {
            client,
            api_key,
            base_url,
            timeout: Duration::from_secs(timeout_secs.max(1)),
            limiter,
        }
    }

    /// Looks up a title. `Ok(None)` means the service does not know the
    /// movie (no director in the response); transport failures and
    /// unparseable payloads surface as [`AppError::Upstream`].
    pub async fn lookup(&self, title: &str) -> AppResult<Option<MovieFacts>> {
        // Use mock data if an API key is not provided
        if self.api_key.trim().is_empty() {
            return Ok(Some(MovieFacts {
                director: "James Cameron".to_string(),
                year: 1997,
                rating: 7.8,
            }));
        }

        self.limiter.until_ready().await;

        let url = self.base_url.trim_end_matches('/').to_string();
        let resp: LookupResponse = self
            .client
            .get(url)
            .timeout(self.timeout)
            .query(&[("apikey", self.api_key.as_str()), ("t", title)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        resp.into_facts()
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "imdbRating")]
    rating: Option<String>,
}

impl LookupResponse {
    fn into_facts(self) -> AppResult<Option<MovieFacts>> {
        // OMDb reports "not found" by omitting the payload fields; it also
        // uses "N/A" for fields it has no data for.
        let Some(director) = self.director.filter(|d| is_present(d)) else {
            return Ok(None);
        };

        let year = self
            .year
            .as_deref()
            .filter(|y| is_present(y))
            .and_then(parse_year)
            .ok_or_else(|| AppError::Upstream(format!("unparseable year {:?}", self.year)))?;

        let rating = self
            .rating
            .as_deref()
            .filter(|r| is_present(r))
            .and_then(|r| r.trim().parse::<f64>().ok())
            .ok_or_else(|| AppError::Upstream(format!("unparseable rating {:?}", self.rating)))?;

        Ok(Some(MovieFacts { director: director.trim().to_string(), year, rating }))
    }
}

fn is_present(field: &str) -> bool {
    let field = field.trim();
    !field.is_empty() && field != "N/A"
}

// Series entries come back as ranges like "1997–1998"; the leading year is
// enough for us.
fn parse_year(raw: &str) -> Option<i32> {
    let leading: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    (leading.len() == 4).then(|| leading.parse().ok()).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_payload_parses_into_facts() {
        let resp: LookupResponse = serde_json::from_str(
            r#"{"Title":"Titanic","Year":"1997","Director":"James Cameron",
                "imdbRating":"7.8","Response":"True"}"#,
        )
        .unwrap();

        let facts = resp.into_facts().unwrap().unwrap();
        assert_eq!(facts.director, "James Cameron");
        assert_eq!(facts.year, 1997);
        assert_eq!(facts.rating, 7.8);
    }

    #[test]
    fn missing_director_means_not_found() {
        let resp: LookupResponse =
            serde_json::from_str(r#"{"Response":"False","Error":"Movie not found!"}"#).unwrap();
        assert_eq!(resp.into_facts().unwrap(), None);

        let resp: LookupResponse =
            serde_json::from_str(r#"{"Director":"N/A","Year":"1997","imdbRating":"7.8"}"#)
                .unwrap();
        assert_eq!(resp.into_facts().unwrap(), None);
    }

    #[test]
    fn unparseable_year_or_rating_is_an_upstream_error() {
        let resp: LookupResponse =
            serde_json::from_str(r#"{"Director":"X","Year":"N/A","imdbRating":"7.8"}"#).unwrap();
        assert!(matches!(resp.into_facts().unwrap_err(), AppError::Upstream(_)));

        let resp: LookupResponse =
            serde_json::from_str(r#"{"Director":"X","Year":"1997","imdbRating":"N/A"}"#).unwrap();
        assert!(matches!(resp.into_facts().unwrap_err(), AppError::Upstream(_)));
    }

    #[test]
    fn year_ranges_take_the_leading_year() {
        assert_eq!(parse_year("1997–1998"), Some(1997));
        assert_eq!(parse_year(" 2010 "), Some(2010));
        assert_eq!(parse_year("??"), None);
    }
}
