//! Link resolution.
//!
//! [`LinkResolver`] turns a [`Link`] into a URL. Literal hrefs pass through
//! unchanged; route links go through the injected [`RouteResolver`] after the
//! registered parameter hooks have had a chance to add parameters.

use crate::error::Result;
use crate::link::{Link, LinkTarget, Params};
use crate::route::{RouteMatch, RouteResolver};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// What a parameter hook can see about the link being resolved.
#[derive(Debug, Clone, Copy)]
pub struct ParamContext<'a> {
    /// Route the link points at.
    pub route: &'a str,
    /// Parameters captured from the current request path.
    pub matched: &'a Params,
}

/// Adjusts route parameters before a route link is assembled.
pub trait ParamHook: Send + Sync {
    fn apply(&self, ctx: &ParamContext<'_>, params: &mut Params);
}

impl<F> ParamHook for F
where
    F: Fn(&ParamContext<'_>, &mut Params) + Send + Sync,
{
    fn apply(&self, ctx: &ParamContext<'_>, params: &mut Params) {
        self(ctx, params)
    }
}

/// Copies request path parameters into every route link.
///
/// Parameters already set on the link win. Names in `exclude` (normally the
/// identity parameter) are never copied, so a collection page never inherits
/// the identifier of the resource that was requested.
#[derive(Debug, Clone, Default)]
pub struct InheritMatchedParams {
    exclude: HashSet<String>,
}

impl InheritMatchedParams {
    pub fn new<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }
}

impl ParamHook for InheritMatchedParams {
    fn apply(&self, ctx: &ParamContext<'_>, params: &mut Params) {
        for (key, value) in ctx.matched {
            if self.exclude.contains(key) || params.contains_key(key) {
                continue;
            }
            params.insert(key.clone(), value.clone());
        }
    }
}

/// Resolves links to URLs.
pub struct LinkResolver {
    routes: Arc<dyn RouteResolver>,
    hooks: RwLock<Vec<Arc<dyn ParamHook>>>,
}

impl LinkResolver {
    pub fn new<R: RouteResolver + 'static>(routes: R) -> Self {
        Self::from_arc(Arc::new(routes))
    }

    pub fn from_arc(routes: Arc<dyn RouteResolver>) -> Self {
        Self {
            routes,
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a parameter hook. Hooks run in registration order.
    pub fn add_param_hook<H: ParamHook + 'static>(&self, hook: H) {
        self.hooks.write().push(Arc::new(hook));
    }

    /// Register the [`InheritMatchedParams`] hook.
    pub fn inherit_matched_params<I, S>(&self, exclude: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_param_hook(InheritMatchedParams::new(exclude));
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }

    /// Resolve `link` to a URL.
    ///
    /// `matched` holds the parameters captured from the current request.
    pub fn resolve(&self, link: &Link, matched: &Params) -> Result<String> {
        match link.target() {
            LinkTarget::Href(href) => Ok(href.clone()),
            LinkTarget::Route {
                name,
                params,
                query,
            } => {
                let mut params = params.clone();
                let ctx = ParamContext {
                    route: name,
                    matched,
                };
                for hook in self.hooks.read().iter() {
                    hook.apply(&ctx, &mut params);
                }

                let url = self.routes.assemble(name, &params, query)?;
                trace!(rel = link.rel(), route = %name, url = %url, "Resolved link");
                Ok(url)
            }
        }
    }

    /// Match a request path through the underlying route resolver.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.routes.match_path(path)
    }

    pub fn routes(&self) -> &Arc<dyn RouteResolver> {
        &self.routes
    }
}

impl fmt::Debug for LinkResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkResolver")
            .field("hooks", &self.hook_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HalError;
    use crate::route::RouteTable;

    fn resolver() -> LinkResolver {
        let routes = RouteTable::new()
            .route("users", "/users[/{id}]")
            .unwrap()
            .route("author-posts", "/authors/{author_id}/posts[/{post_id}]")
            .unwrap();
        LinkResolver::new(routes)
    }

    fn matched(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_href_passes_through() {
        let link = Link::href("describedby", "https://example.com/docs");
        let url = resolver().resolve(&link, &Params::new()).unwrap();
        assert_eq!(url, "https://example.com/docs");
    }

    #[test]
    fn test_route_link() {
        let link = Link::route("self", "users").with_param("id", "mwop");
        let url = resolver().resolve(&link, &Params::new()).unwrap();
        assert_eq!(url, "/users/mwop");
    }

    #[test]
    fn test_missing_param_is_unresolvable() {
        let link = Link::route("self", "author-posts");
        let err = resolver().resolve(&link, &Params::new()).unwrap_err();
        assert!(matches!(err, HalError::UnresolvableRoute { .. }));
    }

    #[test]
    fn test_inherit_matched_params_excludes_identity() {
        let resolver = resolver();
        resolver.inherit_matched_params(["post_id"]);

        let request = matched(&[("author_id", "3"), ("post_id", "9")]);
        let link = Link::route("self", "author-posts");
        assert_eq!(
            resolver.resolve(&link, &request).unwrap(),
            "/authors/3/posts"
        );

        let link = Link::route("self", "author-posts").with_param("author_id", "5");
        assert_eq!(
            resolver.resolve(&link, &request).unwrap(),
            "/authors/5/posts"
        );
    }

    struct DefaultAuthor;

    impl ParamHook for DefaultAuthor {
        fn apply(&self, ctx: &ParamContext<'_>, params: &mut Params) {
            if ctx.route == "author-posts" {
                params
                    .entry("author_id".to_string())
                    .or_insert_with(|| "1".to_string());
            }
        }
    }

    #[test]
    fn test_custom_hook() {
        let resolver = resolver();
        resolver.add_param_hook(DefaultAuthor);

        let link = Link::route("self", "author-posts").with_param("post_id", "2");
        assert_eq!(
            resolver.resolve(&link, &Params::new()).unwrap(),
            "/authors/1/posts/2"
        );
        assert_eq!(resolver.hook_count(), 1);
    }

    #[test]
    fn test_match_path_delegates() {
        let found = resolver().match_path("/authors/3/posts/9").unwrap();
        assert_eq!(found.name, "author-posts");
        assert_eq!(found.params.get("post_id"), Some(&"9".to_string()));
    }
}
