use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A numeric field the API may send as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    /// Returns the value only when it is a finite number.
    pub fn as_finite(&self) -> Option<f64> {
        let value = match self {
            LooseNumber::Number(n) => *n,
            LooseNumber::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for LooseNumber {
    fn from(value: f64) -> Self {
        LooseNumber::Number(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Sale,
    Rent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub price: Option<LooseNumber>,
    #[serde(default)]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<LooseNumber>,
    #[serde(default)]
    pub lng: Option<LooseNumber>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "image_urls")]
    pub images: Vec<String>,
}

impl Property {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.lat.as_ref()?.as_finite()?;
        let lng = self.lng.as_ref()?.as_finite()?;
        Some((lat, lng))
    }

    pub fn price_value(&self) -> Option<f64> {
        self.price.as_ref().and_then(LooseNumber::as_finite)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Image entries arrive either as plain URLs or as `{ "url": ... }` objects.
/// Anything else is skipped so one odd row cannot sink the whole listing.
fn image_urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(url) => Some(url),
            Value::Object(mut fields) => match fields.remove("url") {
                Some(Value::String(url)) => Some(url),
                _ => None,
            },
            _ => None,
        })
        .collect())
}

/// Compact snapshot of a property embedded in contact requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySnapshot {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub price: Option<LooseNumber>,
}

/// Structured property filter, used both by saved searches and the map view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(operation) = self.operation {
            if property.operation != Some(operation) {
                return false;
            }
        }
        if let Some(kind) = &self.property_type {
            let same = property
                .property_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(kind));
            if !same {
                return false;
            }
        }
        if let Some(city) = &self.city {
            let same = property
                .city
                .as_deref()
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(city.trim()));
            if !same {
                return false;
            }
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = property.price_value() else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if self.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let haystack = format!(
                "{} {} {}",
                property.title,
                property.city.as_deref().unwrap_or_default(),
                property.address.as_deref().unwrap_or_default()
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }
}
