//! Turning user-supplied references into backend IDs.
//!
//! A reference is either an opaque ID or a display name. An exact ID match
//! always wins; otherwise the first entry whose name matches exactly, in the
//! order the backend listed them, is taken. Names are not unique, so a name
//! that appears twice resolves to the earlier entry.

use tracing::{debug, info};

use crate::api::ApiClient;
use crate::error::{Error, ResourceKind, Result};
use crate::models::{Model, Notebook, Transformation};
use crate::transport::Transport;

/// A listed resource that can be referenced by ID or name.
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

impl Named for Notebook {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Transformation {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Match `token` against a listing. Case-sensitive, no trimming.
pub fn lookup<'a, R: Named>(items: &'a [R], token: &str) -> Option<&'a R> {
    items
        .iter()
        .find(|item| item.id() == token)
        .or_else(|| items.iter().find(|item| item.name() == token))
}

/// Outcome of `resolve_or_create_notebook`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: String,
    pub created: bool,
}

/// Resolve a reference of the given kind, failing with `NotFound` on a miss.
pub fn resolve<T: Transport>(api: &ApiClient<T>, kind: ResourceKind, token: &str) -> Result<String> {
    check_token(kind, token)?;
    let found = match kind {
        ResourceKind::Notebook => lookup(&api.list_notebooks()?, token).map(|n| n.id.clone()),
        ResourceKind::Transformation => {
            lookup(&api.list_transformations()?, token).map(|t| t.id.clone())
        }
    };
    match found {
        Some(id) => {
            debug!(%kind, token, %id, "resolved reference");
            Ok(id)
        }
        None => Err(Error::NotFound {
            kind,
            token: token.to_string(),
        }),
    }
}

/// Resolve a notebook reference, creating a notebook named `token` when
/// nothing matches. Creation-on-miss exists only for notebooks.
pub fn resolve_or_create_notebook<T: Transport>(api: &ApiClient<T>, token: &str) -> Result<Resolved> {
    match resolve(api, ResourceKind::Notebook, token) {
        Ok(id) => Ok(Resolved { id, created: false }),
        Err(Error::NotFound { .. }) => {
            let notebook = api.create_notebook(token, "")?;
            info!(name = token, id = %notebook.id, "created notebook");
            Ok(Resolved {
                id: notebook.id,
                created: true,
            })
        }
        Err(e) => Err(e),
    }
}

/// Resolve a list of transformation references in order.
pub fn resolve_transformations<T: Transport>(api: &ApiClient<T>, tokens: &[String]) -> Result<Vec<String>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let listing = api.list_transformations()?;
    tokens
        .iter()
        .map(|token| {
            check_token(ResourceKind::Transformation, token)?;
            lookup(&listing, token)
                .map(|t| t.id.clone())
                .ok_or_else(|| Error::NotFound {
                    kind: ResourceKind::Transformation,
                    token: token.clone(),
                })
        })
        .collect()
}

fn check_token(kind: ResourceKind, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::UserInput(format!("{kind} reference must not be empty")));
    }
    Ok(())
}

/// Pick a model ID for Q&A and transformations.
///
/// A non-empty `requested` is returned as is, without checking it exists.
/// Otherwise the first listed model whose provider equals `preferred`, or
/// whose model name contains it (ignoring case), is chosen, falling back to
/// the first model. `None` means the backend has no models at all.
pub fn select_default_model<T: Transport>(
    api: &ApiClient<T>,
    requested: Option<&str>,
    preferred: &str,
) -> Result<Option<String>> {
    if let Some(id) = requested.filter(|id| !id.is_empty()) {
        return Ok(Some(id.to_string()));
    }
    let models = api.list_models()?;
    Ok(pick_model(&models, preferred).map(|m| m.id.clone()))
}

/// Like `select_default_model`, but an empty listing is a configuration error.
pub fn require_model<T: Transport>(
    api: &ApiClient<T>,
    requested: Option<&str>,
    preferred: &str,
) -> Result<String> {
    select_default_model(api, requested, preferred)?.ok_or_else(|| {
        Error::Configuration("no model available: configure a model in the backend or pass --model".into())
    })
}

pub fn pick_model<'a>(models: &'a [Model], preferred: &str) -> Option<&'a Model> {
    let needle = preferred.to_lowercase();
    models
        .iter()
        .find(|m| {
            m.provider.as_deref() == Some(preferred)
                || m
                    .model_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .or_else(|| models.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::Scripted;
    use reqwest::Method;
    use serde_json::json;

    fn notebooks(listing: serde_json::Value) -> ApiClient<Scripted> {
        ApiClient::with_transport(Scripted::new().on(Method::GET, "/notebooks", listing))
    }

    #[test]
    fn resolves_by_name_and_misses_cleanly() {
        let api = notebooks(json!([{"id": "n1", "name": "Research"}]));
        assert_eq!(resolve(&api, ResourceKind::Notebook, "Research").unwrap(), "n1");

        let err = resolve(&api, ResourceKind::Notebook, "Missing").unwrap_err();
        assert!(
            matches!(&err, Error::NotFound { kind: ResourceKind::Notebook, token } if token == "Missing"),
            "{err:?}"
        );
    }

    #[test]
    fn duplicate_names_resolve_to_first_listed() {
        let api = notebooks(json!([
            {"id": "n2", "name": "Papers"},
            {"id": "n1", "name": "Papers"},
        ]));
        assert_eq!(resolve(&api, ResourceKind::Notebook, "Papers").unwrap(), "n2");
    }

    #[test]
    fn id_match_takes_precedence_over_name() {
        let api = notebooks(json!([
            {"id": "n1", "name": "n2"},
            {"id": "n2", "name": "Other"},
        ]));
        assert_eq!(resolve(&api, ResourceKind::Notebook, "n2").unwrap(), "n2");
    }

    #[test]
    fn matching_is_case_sensitive() {
        let api = notebooks(json!([{"id": "n1", "name": "Research"}]));
        assert!(resolve(&api, ResourceKind::Notebook, "research").is_err());
    }

    #[test]
    fn empty_token_is_rejected_before_listing() {
        let api = notebooks(json!([]));
        let err = resolve(&api, ResourceKind::Notebook, "").unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
        assert!(api.transport().calls().is_empty());
    }

    #[test]
    fn transformations_resolve_by_name() {
        let api = ApiClient::with_transport(Scripted::new().on(
            Method::GET,
            "/transformations",
            json!([
                {"id": "transformation:1", "name": "summary", "apply_default": true},
                {"id": "transformation:2", "name": "key_points"},
            ]),
        ));
        assert_eq!(
            resolve(&api, ResourceKind::Transformation, "key_points").unwrap(),
            "transformation:2"
        );
        let ids = resolve_transformations(
            &api,
            &["summary".to_string(), "transformation:2".to_string()],
        )
        .unwrap();
        assert_eq!(ids, vec!["transformation:1", "transformation:2"]);

        let err = resolve_transformations(&api, &["nope".to_string()]).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: ResourceKind::Transformation, .. }));
    }

    #[test]
    fn create_on_miss_then_reuse() {
        let transport = Scripted::new()
            .on(Method::GET, "/notebooks", json!([]))
            .on(Method::GET, "/notebooks", json!([{"id": "notebook:new", "name": "X"}]))
            .on(Method::POST, "/notebooks", json!({"id": "notebook:new", "name": "X"}));
        let api = ApiClient::with_transport(transport);

        let first = resolve_or_create_notebook(&api, "X").unwrap();
        assert_eq!(
            first,
            Resolved {
                id: "notebook:new".into(),
                created: true
            }
        );
        let second = resolve_or_create_notebook(&api, "X").unwrap();
        assert_eq!(
            second,
            Resolved {
                id: "notebook:new".into(),
                created: false
            }
        );

        assert_eq!(api.transport().count(Method::POST, "/notebooks"), 1);
        let create = api
            .transport()
            .calls()
            .into_iter()
            .find(|c| c.method == Method::POST)
            .unwrap();
        assert_eq!(create.body, Some(json!({"name": "X", "description": ""})));
    }

    #[test]
    fn created_notebook_without_id_is_a_decode_error() {
        let transport = Scripted::new()
            .on(Method::GET, "/notebooks", json!([]))
            .on(Method::POST, "/notebooks", json!({}));
        let api = ApiClient::with_transport(transport);

        let err = resolve_or_create_notebook(&api, "X").unwrap_err();
        assert!(matches!(err, Error::Decode { what: "notebook", .. }), "{err:?}");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn transport_errors_are_not_treated_as_misses() {
        let api = ApiClient::with_transport(Scripted::new().on_status(
            Method::GET,
            "/notebooks",
            503,
            "unavailable",
        ));
        let err = resolve_or_create_notebook(&api, "X").unwrap_err();
        assert!(matches!(err, Error::Status { status: 503, .. }));
        assert_eq!(api.transport().count(Method::POST, "/notebooks"), 0);
    }

    fn models(listing: serde_json::Value) -> ApiClient<Scripted> {
        ApiClient::with_transport(Scripted::new().on(Method::GET, "/models", listing))
    }

    #[test]
    fn preferred_provider_wins_otherwise_first() {
        let api = models(json!([
            {"id": "m1", "provider": "openai"},
            {"id": "m2", "provider": "gemini"},
        ]));
        assert_eq!(select_default_model(&api, None, "gemini").unwrap().as_deref(), Some("m2"));
        // repeated calls are stable
        assert_eq!(select_default_model(&api, None, "gemini").unwrap().as_deref(), Some("m2"));

        let api = models(json!([{"id": "m1", "provider": "openai"}]));
        assert_eq!(select_default_model(&api, None, "gemini").unwrap().as_deref(), Some("m1"));
    }

    #[test]
    fn model_name_substring_matches_ignoring_case() {
        let api = models(json!([
            {"id": "m1", "provider": "openrouter", "model_name": "gpt-4o"},
            {"id": "m2", "provider": "openrouter", "model_name": "Google/Gemini-2.0-Flash"},
        ]));
        assert_eq!(select_default_model(&api, None, "gemini").unwrap().as_deref(), Some("m2"));
    }

    #[test]
    fn requested_model_is_returned_verbatim_without_listing() {
        let api = models(json!([{"id": "m1", "provider": "openai"}]));
        assert_eq!(
            select_default_model(&api, Some("model:unknown"), "gemini")
                .unwrap()
                .as_deref(),
            Some("model:unknown")
        );
        assert!(api.transport().calls().is_empty());

        // an empty request falls through to selection
        assert_eq!(select_default_model(&api, Some(""), "gemini").unwrap().as_deref(), Some("m1"));
    }

    #[test]
    fn empty_listing_means_no_model() {
        let api = models(json!([]));
        assert_eq!(select_default_model(&api, None, "gemini").unwrap(), None);
        let err = require_model(&api, None, "gemini").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
