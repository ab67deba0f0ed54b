//! Request builder.
//!
//! Turns a binding-free [`ValueSource`] into a concrete [`RequestSpec`]. The
//! builder performs no I/O and keeps no state, so the same inputs always yield
//! the same request.

use nac_types::{BasePaths, LinkDescriptor, PageContext, PageDescriptor, RequestSpec, ResourceName, ValueSource};
use nac_util::{encode_path_segment, join_url_path};
use serde_json::{Map, Value};

use crate::ResolveError;

/// Fields projected by combined dictionary lookups.
const DICTIONARY_FIELDS: &str = "id,name,type";
/// Instruction asking the backend to group dictionary entries by type.
const DICTIONARY_COMBINE: &str = "type";

/// Build the request for one descriptor.
///
/// - relative link: `GET join(generate, link)`
/// - `nolocation` link: `GET link`
/// - API call: `POST generate` with body `{ call: value }`
/// - page API: `POST <page>?<marker>` with body `{ call: parameters }`
/// - page link: `GET link`
/// - dictionary: the combined dictionary request for its single type
///
/// # Errors
/// A page API descriptor without a page context is a contract violation.
pub fn build_request(source: &ValueSource, paths: &BasePaths, page: Option<&PageContext>) -> Result<RequestSpec, ResolveError> {
    match source {
        ValueSource::Link(LinkDescriptor { link, nolocation: true }) => Ok(RequestSpec::get(link.clone())),
        ValueSource::Link(LinkDescriptor { link, nolocation: false }) => {
            Ok(RequestSpec::get(join_url_path(paths.path(ResourceName::Generate), link)))
        }
        ValueSource::ApiCall(descriptor) => Ok(RequestSpec::post(
            paths.path(ResourceName::Generate),
            single_key_body(&descriptor.call, &descriptor.value),
        )),
        ValueSource::Page(PageDescriptor::Api { call, parameters }) => {
            let page = page.ok_or_else(|| ResolveError::contract(format!("page call '{call}' needs a page context")))?;
            Ok(RequestSpec::post(page.ajax_url(), single_key_body(call, parameters)))
        }
        ValueSource::Page(PageDescriptor::Link { link }) => Ok(RequestSpec::get(link.clone())),
        ValueSource::Dictionary(descriptor) => Ok(build_dictionary_request(
            std::slice::from_ref(&descriptor.dictionary_type),
            paths,
        )),
    }
}

/// Build one request covering every requested dictionary type.
///
/// Types are percent-encoded as path segments and joined with `,`.
pub fn build_dictionary_request(types: &[String], paths: &BasePaths) -> RequestSpec {
    let joined_types = types.iter().map(|dictionary_type| encode_path_segment(dictionary_type)).collect::<Vec<_>>().join(",");
    RequestSpec::get(join_url_path(paths.path(ResourceName::DictionariesByType), &joined_types))
        .with_query("fields", DICTIONARY_FIELDS)
        .with_query("combine", DICTIONARY_COMBINE)
}

fn single_key_body(key: &str, value: &Value) -> Value {
    let mut body = Map::with_capacity(1);
    body.insert(key.to_string(), value.clone());
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nac_types::HttpMethod;
    use serde_json::json;

    fn paths(generate: &str) -> BasePaths {
        BasePaths {
            generate: generate.into(),
            ..BasePaths::default()
        }
    }

    #[test]
    fn relative_link_never_produces_double_separator() {
        for base in ["/api/generate", "/api/generate/"] {
            for link in ["groups", "/groups"] {
                let request = build_request(&ValueSource::link(link), &paths(base), None).expect("request");
                assert_eq!(request.method, HttpMethod::Get);
                assert_eq!(request.url, "/api/generate/groups", "base={base} link={link}");
            }
        }
    }

    #[test]
    fn nolocation_link_is_used_verbatim() {
        let request = build_request(&ValueSource::absolute_link("/ers/config/sgt"), &paths("/api/generate/"), None).expect("request");
        assert_eq!(request, RequestSpec::get("/ers/config/sgt"));
    }

    #[test]
    fn api_call_posts_single_key_body_to_generate() {
        let value = json!({ "vendor": "cisco", "limit": 20 });
        let request = build_request(&ValueSource::api_call("models", value.clone()), &paths("/api/generate"), None).expect("request");

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "/api/generate");
        let body = request.body.expect("body");
        let body = body.as_object().expect("object body");
        assert_eq!(body.len(), 1);
        assert_eq!(body.get("models"), Some(&value));
    }

    #[test]
    fn page_api_posts_to_current_page_with_ajax_marker() {
        let page = PageContext::new("/admin/network-devices");
        let request =
            build_request(&ValueSource::page_api("vendors", json!(["radius"])), &BasePaths::default(), Some(&page)).expect("request");
        assert_eq!(request, RequestSpec::post("/admin/network-devices?ajax", json!({ "vendors": ["radius"] })));
    }

    #[test]
    fn page_api_without_page_context_is_a_contract_error() {
        let error = build_request(&ValueSource::page_api("vendors", Value::Null), &BasePaths::default(), None).expect_err("no page");
        assert_eq!(error.kind(), "contract");
    }

    #[test]
    fn page_link_is_not_joined_to_any_base() {
        let request = build_request(&ValueSource::page_link("lists/groups"), &BasePaths::default(), None).expect("request");
        assert_eq!(request, RequestSpec::get("lists/groups"));
    }

    #[test]
    fn dictionary_request_embeds_all_types_and_projection() {
        let request = build_dictionary_request(&["1".into(), "Device Type".into()], &BasePaths::default());
        assert_eq!(request.url, "/api/dictionaries/types/1,Device%20Type");
        assert_eq!(
            request.query,
            vec![("fields".to_string(), "id,name,type".to_string()), ("combine".to_string(), "type".to_string())]
        );
    }

    #[test]
    fn building_twice_yields_identical_requests() {
        let page = PageContext::new("/admin/policy");
        let sources = [
            ValueSource::link("/groups"),
            ValueSource::absolute_link("/x"),
            ValueSource::api_call("models", json!({ "a": 1 })),
            ValueSource::page_api("vendors", json!(null)),
            ValueSource::dictionary("4"),
        ];
        for source in sources {
            let first = build_request(&source, &BasePaths::default(), Some(&page)).expect("first");
            let second = build_request(&source, &BasePaths::default(), Some(&page)).expect("second");
            assert_eq!(first, second);
        }
    }
}
