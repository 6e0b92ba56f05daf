use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Admin movie form as submitted; every field arrives as text.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovieForm {
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub banner_url: String,
    pub trailer_url: String,
    pub download_url: String,
    pub year: String,
    pub rating: String,
    pub duration: String,
    pub category_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CategoryForm {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportSearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportForm {
    pub movie_id: i64,
    #[serde(default, deserialize_with = "category_ref")]
    pub category_id: Option<i32>,
}

/// Body of `POST /api/tmdb-import`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub action: String,
    pub query: Option<String>,
    pub movie_id: Option<i64>,
    #[serde(default, deserialize_with = "category_ref")]
    pub category_id: Option<i32>,
}

/// Accepts a category id as a number, a numeric string, `""` or `null`.
fn category_ref<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(id)) => Ok(Some(id)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid category id {s:?}"))),
    }
}

/// Per-field validation messages, first message per field wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn required(&mut self, field: &'static str, value: &str, message: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, message);
            return None;
        }
        Some(value.to_string())
    }

    pub fn number<T: FromStr>(
        &mut self,
        field: &'static str,
        value: &str,
        message: &str,
    ) -> Option<T> {
        match value.trim().parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.add(field, message);
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_request_accepts_category_shapes() {
        let parse = |json: &str| serde_json::from_str::<ProxyRequest>(json).unwrap();

        let req = parse(r#"{"action": "import", "movieId": 603, "categoryId": 4}"#);
        assert_eq!(req.movie_id, Some(603));
        assert_eq!(req.category_id, Some(4));

        assert_eq!(parse(r#"{"action": "import", "categoryId": "7"}"#).category_id, Some(7));
        assert_eq!(parse(r#"{"action": "import", "categoryId": ""}"#).category_id, None);
        assert_eq!(parse(r#"{"action": "import", "categoryId": null}"#).category_id, None);
        assert_eq!(parse(r#"{"action": "search", "query": "heat"}"#).category_id, None);

        let bad_category = r#"{"action": "import", "categoryId": "x"}"#;
        assert!(serde_json::from_str::<ProxyRequest>(bad_category).is_err());
    }

    #[test]
    fn field_errors_keep_first_message() {
        let mut errors = FieldErrors::default();
        assert_eq!(errors.number::<i32>("year", " 2001 ", "bad"), Some(2001));
        assert!(errors.is_empty());

        assert_eq!(errors.number::<i32>("year", "20x1", "Valid year is required"), None);
        errors.add("year", "second");
        assert_eq!(errors.get("year"), Some("Valid year is required"));
        assert_eq!(errors.required("title", "  Heat ", "x"), Some("Heat".to_string()));
    }
}
