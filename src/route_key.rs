//! Parsing of route keys (`"GET /users/:id"`) into anchored path matchers.
use crate::SchmockError;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;

/// The verbs a route key (and a request) may use.
pub const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

static PARAM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid param name regex"));

/// A route key split into its method and a matcher for its path.
#[derive(Debug, Clone)]
pub struct ParsedRoute {
    /// The key exactly as it was registered.
    pub key: String,
    pub method: Method,
    /// The path the matcher was built from, namespace included once compiled.
    pub path: String,
    /// Always anchored at both ends: it never accepts a prefix or a suffix of a path.
    pub matcher: Regex,
    /// Parameter names, one per capture group, left to right.
    pub param_names: Vec<String>,
}

impl ParsedRoute {
    /// Rebuild the path and its matcher with `namespace` in front.
    ///
    /// `namespace` is expected to be normalized already: a leading `/`, no trailing `/`.
    pub(crate) fn with_namespace(self, namespace: &str) -> Result<Self, SchmockError> {
        let (matcher, param_names) = path_matcher(&self.key, namespace, &self.path)?;
        Ok(Self {
            path: format!("{}{}", namespace, self.path),
            matcher,
            param_names,
            ..self
        })
    }
}

/// Parse a route key of the form `<METHOD> <path>`.
pub fn parse_route_key(key: &str) -> Result<ParsedRoute, SchmockError> {
    let fail = |reason: &str| SchmockError::RouteParse {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (method, path) = key
        .split_once(' ')
        .ok_or_else(|| fail("expected \"<METHOD> <path>\""))?;
    let path = path.trim();

    if method.is_empty() {
        return Err(fail("missing HTTP method"));
    }
    let method = parse_method(method).ok_or_else(|| {
        fail("unsupported HTTP method, expected one of GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS")
    })?;
    if path.is_empty() {
        return Err(fail("missing path"));
    }
    if !path.starts_with('/') {
        return Err(fail("path must start with '/'"));
    }

    let (matcher, param_names) = path_matcher(key, "", path)?;
    Ok(ParsedRoute {
        key: key.to_string(),
        method,
        path: path.to_string(),
        matcher,
        param_names,
    })
}

/// Look `method` up in the supported verb set.
///
/// Matching is case-sensitive: `get` is not a method.
pub fn parse_method(method: &str) -> Option<Method> {
    SUPPORTED_METHODS
        .iter()
        .find(|supported| supported.as_str() == method)
        .cloned()
}

fn path_matcher(
    key: &str,
    namespace: &str,
    path: &str,
) -> Result<(Regex, Vec<String>), SchmockError> {
    // The namespace is matched literally, even if one of its segments starts with `:`.
    let mut pattern = format!("^{}", regex::escape(namespace));
    let mut param_names = vec![];

    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            pattern.push('/');
        }
        match segment.strip_prefix(':') {
            Some(name) => {
                if !PARAM_NAME.is_match(name) {
                    return Err(SchmockError::RouteParse {
                        key: key.to_string(),
                        reason: format!("invalid parameter name \"{}\"", name),
                    });
                }
                param_names.push(name.to_string());
                // Empty captures are rejected by `RouteTable::match_route`.
                pattern.push_str("([^/]*)");
            }
            None => pattern.push_str(&regex::escape(segment)),
        }
    }
    pattern.push('$');

    let matcher = Regex::new(&pattern).map_err(|e| SchmockError::RouteParse {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok((matcher, param_names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_param_names_left_to_right() {
        let route = parse_route_key("GET /a/:x/b/:y").unwrap();

        assert_eq!(route.method, Method::GET);
        assert_eq!(route.path, "/a/:x/b/:y");
        assert_eq!(route.param_names, vec!["x", "y"]);
        let captures = route.matcher.captures("/a/V1/b/V2").unwrap();
        assert_eq!(&captures[1], "V1");
        assert_eq!(&captures[2], "V2");
    }

    #[test]
    fn matcher_is_anchored() {
        let route = parse_route_key("GET /a/:x/b/:y").unwrap();

        assert!(!route.matcher.is_match("/a/V1/b/V2/extra"));
        assert!(!route.matcher.is_match("/prefix/a/V1/b/V2"));
    }

    #[test]
    fn literal_segments_are_escaped() {
        let route = parse_route_key("GET /files/report.v1+(draft)").unwrap();

        assert!(route.matcher.is_match("/files/report.v1+(draft)"));
        assert!(!route.matcher.is_match("/files/reportXv1+(draft)"));
        assert!(!route.matcher.is_match("/files/report.v11(draft)"));
    }

    #[test]
    fn duplicate_param_names_are_accepted() {
        let route = parse_route_key("GET /a/:id/b/:id").unwrap();

        assert_eq!(route.param_names, vec!["id", "id"]);
    }

    #[test]
    fn root_path_is_valid() {
        let route = parse_route_key("DELETE /").unwrap();

        assert!(route.matcher.is_match("/"));
        assert!(!route.matcher.is_match(""));
    }

    #[test]
    fn rejects_malformed_keys() {
        let malformed = [
            "",
            "/users",
            " /users",
            "get /users",
            "FETCH /users",
            "GET",
            "GET ",
            "GET users",
            "GET /users/:",
            "GET /users/:1d",
        ];

        for key in malformed {
            let error = parse_route_key(key).unwrap_err();
            assert!(
                matches!(error, SchmockError::RouteParse { .. }),
                "{:?} should not parse",
                key
            );
            assert_eq!(error.code(), "ROUTE_PARSE_ERROR");
        }
    }

    #[test]
    fn namespace_is_prepended_to_the_matcher() {
        let route = parse_route_key("GET /users/:id")
            .unwrap()
            .with_namespace("/api.v1")
            .unwrap();

        assert_eq!(route.path, "/api.v1/users/:id");
        assert_eq!(route.param_names, vec!["id"]);
        assert!(route.matcher.is_match("/api.v1/users/1"));
        assert!(!route.matcher.is_match("/apiXv1/users/1"));
        assert!(!route.matcher.is_match("/users/1"));
    }

    #[test]
    fn namespace_segments_are_never_parameters() {
        let route = parse_route_key("GET /users")
            .unwrap()
            .with_namespace("/:tenant")
            .unwrap();

        assert!(route.param_names.is_empty());
        assert!(route.matcher.is_match("/:tenant/users"));
        assert!(!route.matcher.is_match("/acme/users"));
    }
}
