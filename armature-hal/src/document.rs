//! HAL JSON documents.
//!
//! Serialization walks a resource tree and resolves every link through the
//! supplied closure; the renderer passes its [`LinkResolver`](crate::LinkResolver),
//! while [`resolve_href_only`] serves trees that only hold literal hrefs.
//!
//! Documents look like:
//!
//! ```json
//! {
//!   "_links": { "self": { "href": "/users/mwop" } },
//!   "id": "mwop",
//!   "name": "Matthew",
//!   "_embedded": { "posts": [ ... ] }
//! }
//! ```

use crate::collection::HalCollection;
use crate::error::{HalError, Result};
use crate::identity::identifier_string;
use crate::link::{Link, LinkCollection, LinkTarget};
use crate::resource::{Embedded, HalResource, RESERVED_KEYS};
use serde_json::{Map, Value};

/// Attributes describing the page of a collection document.
const PAGE_ATTRIBUTES: [&str; 4] = ["page", "page_count", "page_size", "total_items"];

/// Resolves a single link to its URL.
pub type Resolve<'a> = dyn Fn(&Link) -> Result<String> + 'a;

/// Resolver for trees holding literal hrefs only.
pub fn resolve_href_only(link: &Link) -> Result<String> {
    match link.target() {
        LinkTarget::Href(href) => Ok(href.clone()),
        LinkTarget::Route { name, .. } => Err(HalError::unresolvable(
            name,
            "no route resolver available",
        )),
    }
}

/// Render a link collection as the `_links` object.
///
/// A relation holding one link renders as an object, several as an array.
pub fn links_to_value(links: &LinkCollection, resolve: &Resolve<'_>) -> Result<Value> {
    let mut object = Map::new();
    for (rel, group) in links.iter() {
        let mut rendered = Vec::with_capacity(group.len());
        for link in group {
            rendered.push(link.to_json(resolve(link)?));
        }
        let value = if rendered.len() == 1 {
            rendered.remove(0)
        } else {
            Value::Array(rendered)
        };
        object.insert(rel.to_string(), value);
    }
    Ok(Value::Object(object))
}

/// Serialize a resource: `_links`, then its fields, then `_embedded`.
pub fn resource_to_value(resource: &HalResource, resolve: &Resolve<'_>) -> Result<Value> {
    let mut object = Map::new();
    object.insert("_links".to_string(), links_to_value(resource.links(), resolve)?);

    for (key, value) in resource.data() {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            object.insert(key.clone(), value.clone());
        }
    }

    if !resource.embedded().is_empty() {
        let mut embedded = Map::new();
        for (name, value) in resource.embedded() {
            embedded.insert(name.clone(), embedded_to_value(value, resolve)?);
        }
        object.insert("_embedded".to_string(), Value::Object(embedded));
    }

    Ok(Value::Object(object))
}

fn embedded_to_value(embedded: &Embedded, resolve: &Resolve<'_>) -> Result<Value> {
    match embedded {
        Embedded::Resource(resource) => resource_to_value(resource, resolve),
        Embedded::Resources(resources) => resources
            .iter()
            .map(|r| resource_to_value(r, resolve))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Embedded::Collection(collection) => collection_to_value(collection, resolve),
    }
}

/// Serialize a collection.
///
/// Members are embedded under the collection name; when the total is known
/// the page attributes are added at the top level.
pub fn collection_to_value(collection: &HalCollection, resolve: &Resolve<'_>) -> Result<Value> {
    let mut object = Map::new();
    object.insert(
        "_links".to_string(),
        links_to_value(collection.links(), resolve)?,
    );

    for (key, value) in collection.attributes() {
        if !RESERVED_KEYS.contains(&key.as_str()) && !PAGE_ATTRIBUTES.contains(&key.as_str()) {
            object.insert(key.clone(), value.clone());
        }
    }

    let members = collection
        .resources()
        .iter()
        .map(|r| resource_to_value(r, resolve))
        .collect::<Result<Vec<_>>>()?;
    let mut embedded = Map::new();
    embedded.insert(collection.collection_name().to_string(), Value::Array(members));
    object.insert("_embedded".to_string(), Value::Object(embedded));

    if let (Some(total), Some(page_count)) =
        (collection.total_item_count(), collection.page_count())
    {
        object.insert("page".to_string(), collection.page().into());
        object.insert("page_count".to_string(), page_count.into());
        object.insert("page_size".to_string(), collection.page_size().into());
        object.insert("total_items".to_string(), total.into());
    }

    Ok(Value::Object(object))
}

/// Plain JSON for a resource: its fields with embedded values inlined.
pub fn plain_resource(resource: &HalResource) -> Value {
    let mut object = resource.data().clone();
    for (name, embedded) in resource.embedded() {
        let value = match embedded {
            Embedded::Resource(resource) => plain_resource(resource),
            Embedded::Resources(resources) => {
                Value::Array(resources.iter().map(plain_resource).collect())
            }
            Embedded::Collection(collection) => plain_collection(collection),
        };
        object.insert(name.clone(), value);
    }
    Value::Object(object)
}

/// Plain JSON for a collection: the array of its members.
pub fn plain_collection(collection: &HalCollection) -> Value {
    Value::Array(collection.resources().iter().map(plain_resource).collect())
}

/// The `self` href of a serialized document.
pub fn self_href(document: &Value) -> Option<&str> {
    let link = document.get("_links")?.get("self")?;
    let link = match link {
        Value::Array(links) => links.first()?,
        other => other,
    };
    link.get("href")?.as_str()
}

/// Parse a HAL document back into a resource.
///
/// Nested objects under `_embedded` become resources and arrays become
/// resource lists. The identifier is taken from the `id` field, falling back
/// to the last path segment of the `self` href.
pub fn parse_resource(document: &Value) -> Result<HalResource> {
    let object = document
        .as_object()
        .ok_or_else(|| HalError::InvalidDocument("resource must be a JSON object".to_string()))?;

    let mut resource = HalResource::new(object.clone());
    if let Some(links) = object.get("_links") {
        *resource.links_mut() = parse_links(links)?;
    }

    if let Some(embedded) = object.get("_embedded") {
        let embedded = embedded
            .as_object()
            .ok_or_else(|| HalError::InvalidDocument("_embedded must be an object".to_string()))?;
        for (name, value) in embedded {
            let value = match value {
                Value::Array(items) => Embedded::Resources(
                    items.iter().map(parse_resource).collect::<Result<Vec<_>>>()?,
                ),
                other => Embedded::Resource(Box::new(parse_resource(other)?)),
            };
            resource.set_embedded(name.clone(), value);
        }
    }

    let identifier = object
        .get("id")
        .and_then(identifier_string)
        .or_else(|| self_href(document).and_then(last_segment));
    resource.set_identifier(identifier);

    Ok(resource)
}

/// Parse a HAL collection document whose members sit under `collection_name`.
pub fn parse_collection(document: &Value, collection_name: &str) -> Result<HalCollection> {
    let object = document.as_object().ok_or_else(|| {
        HalError::InvalidDocument("collection must be a JSON object".to_string())
    })?;

    let members = object
        .get("_embedded")
        .and_then(|e| e.get(collection_name))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            HalError::InvalidDocument(format!(
                "collection has no '_embedded.{}' array",
                collection_name
            ))
        })?;
    let resources = members.iter().map(parse_resource).collect::<Result<Vec<_>>>()?;

    let mut collection = HalCollection::new(resources).with_collection_name(collection_name);
    if let Some(page) = object.get("page").and_then(Value::as_u64) {
        collection = collection.with_page(page);
    }
    if let Some(page_size) = object.get("page_size").and_then(Value::as_u64) {
        collection = collection.with_page_size(page_size);
    }
    if let Some(total) = object.get("total_items").and_then(Value::as_u64) {
        collection = collection.with_total_item_count(total);
    }
    if let Some(links) = object.get("_links") {
        *collection.links_mut() = parse_links(links)?;
    }
    for (key, value) in object {
        if !RESERVED_KEYS.contains(&key.as_str()) && !PAGE_ATTRIBUTES.contains(&key.as_str()) {
            collection.attributes_mut().insert(key.clone(), value.clone());
        }
    }

    Ok(collection)
}

fn parse_links(value: &Value) -> Result<LinkCollection> {
    let object = value
        .as_object()
        .ok_or_else(|| HalError::InvalidDocument("_links must be an object".to_string()))?;

    let mut links = LinkCollection::new();
    for (rel, entry) in object {
        match entry {
            Value::Array(items) => {
                for item in items {
                    links.add(parse_link(rel, item)?);
                }
            }
            other => links.add(parse_link(rel, other)?),
        }
    }
    Ok(links)
}

fn parse_link(rel: &str, value: &Value) -> Result<Link> {
    let href = value.get("href").and_then(Value::as_str).ok_or_else(|| {
        HalError::InvalidDocument(format!("link '{}' has no string href", rel))
    })?;

    let mut link = Link::href(rel, href);
    if let Some(object) = value.as_object() {
        for (key, value) in object {
            match key.as_str() {
                "href" => {}
                "templated" => link = link.templated(value.as_bool().unwrap_or(false)),
                _ => link = link.with_prop(key.clone(), value.clone()),
            }
        }
    }
    Ok(link)
}

fn last_segment(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() || segment.contains(':') {
        return None;
    }
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> HalResource {
        HalResource::from_value(json!({"id": "mwop", "name": "Matthew"}))
            .unwrap()
            .with_identifier("mwop")
            .with_link(Link::href("self", "/users/mwop"))
    }

    #[test]
    fn test_single_link_is_object_many_is_array() {
        let mut links = LinkCollection::new();
        links.add(Link::href("self", "/a"));
        links.add(Link::href("item", "/b"));
        links.add(Link::href("item", "/c"));

        let value = links_to_value(&links, &resolve_href_only).unwrap();
        assert_eq!(
            value,
            json!({
                "self": {"href": "/a"},
                "item": [{"href": "/b"}, {"href": "/c"}]
            })
        );
    }

    #[test]
    fn test_route_links_need_a_resolver() {
        let resource = HalResource::default().with_link(Link::route("self", "users"));
        let err = resource_to_value(&resource, &resolve_href_only).unwrap_err();
        assert!(matches!(err, HalError::UnresolvableRoute { .. }));
    }

    #[test]
    fn test_resource_key_order() {
        let status = HalResource::from_value(json!({"status": "hi", "user": "mwop"}))
            .unwrap()
            .with_link(Link::href("self", "/status/1"))
            .embed("user", user());

        let value = resource_to_value(&status, &resolve_href_only).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["_links", "status", "_embedded"]);
        assert_eq!(
            value["_embedded"]["user"]["_links"]["self"]["href"],
            json!("/users/mwop")
        );
    }

    #[test]
    fn test_collection_page_attributes() {
        let collection = HalCollection::new(vec![user()])
            .with_collection_name("users")
            .with_page(2)
            .with_page_size(30)
            .with_total_item_count(45)
            .with_attribute("page", 99)
            .with_attribute("filter", "active")
            .with_link(Link::href("self", "/users?page=2"));

        let value = collection_to_value(&collection, &resolve_href_only).unwrap();
        assert_eq!(value["page"], json!(2));
        assert_eq!(value["page_count"], json!(2));
        assert_eq!(value["page_size"], json!(30));
        assert_eq!(value["total_items"], json!(45));
        assert_eq!(value["filter"], json!("active"));
        assert_eq!(value["_embedded"]["users"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_collection_without_total_has_no_page_attributes() {
        let collection = HalCollection::new(Vec::new()).with_link(Link::href("self", "/users"));
        let value = collection_to_value(&collection, &resolve_href_only).unwrap();
        assert!(value.get("page").is_none());
        assert_eq!(value["_embedded"]["items"], json!([]));
    }

    #[test]
    fn test_round_trip() {
        let status = HalResource::from_value(json!({"status": "hi"}))
            .unwrap()
            .with_link(Link::href("self", "/status/1"))
            .with_link(Link::href("search", "/status{?q}").templated(true))
            .embed("user", user());

        let serialized = resource_to_value(&status, &resolve_href_only).unwrap();
        let parsed = parse_resource(&serialized).unwrap();

        assert_eq!(parsed.identifier(), Some("1"));
        assert!(parsed.data().get("_links").is_none());
        assert!(parsed.links().first("search").unwrap().is_templated());
        match parsed.embedded_field("user") {
            Some(Embedded::Resource(user)) => assert_eq!(user.identifier(), Some("mwop")),
            other => panic!("unexpected embedded value: {:?}", other),
        }
        assert_eq!(
            resource_to_value(&parsed, &resolve_href_only).unwrap(),
            serialized
        );
    }

    #[test]
    fn test_parse_collection() {
        let document = json!({
            "_links": {"self": {"href": "/users?page=2"}},
            "_embedded": {"users": [{"_links": {"self": {"href": "/users/mwop"}}, "id": "mwop"}]},
            "page": 2,
            "page_count": 2,
            "page_size": 30,
            "total_items": 45,
            "filter": "active"
        });

        let collection = parse_collection(&document, "users").unwrap();
        assert_eq!(collection.resources().len(), 1);
        assert_eq!(collection.page(), 2);
        assert_eq!(collection.total_item_count(), Some(45));
        assert_eq!(collection.attributes().get("filter"), Some(&json!("active")));
        assert!(collection.attributes().get("page").is_none());

        assert!(parse_collection(&document, "items").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_links() {
        let err = parse_resource(&json!({"_links": {"self": {"url": "/x"}}})).unwrap_err();
        assert!(matches!(err, HalError::InvalidDocument(_)));
        assert!(parse_resource(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_plain_resource_inlines_embedded() {
        let status = HalResource::from_value(json!({"status": "hi"}))
            .unwrap()
            .embed("user", user());
        assert_eq!(
            plain_resource(&status),
            json!({"status": "hi", "user": {"id": "mwop", "name": "Matthew"}})
        );
    }

    #[test]
    fn test_self_href() {
        let document = json!({"_links": {"self": [{"href": "/a"}, {"href": "/b"}]}});
        assert_eq!(self_href(&document), Some("/a"));
        assert_eq!(self_href(&json!({})), None);
    }
}
