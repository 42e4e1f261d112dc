//! Output renderings of a tag frequency map.

use serde_json::{Map, Value as JsonValue};

use crate::defaults::CSV_HEADER;
use crate::frequency::TagFrequencyMap;

/// JSON object `{tag: frequency}`, most frequent first.
pub fn to_json(map: &TagFrequencyMap) -> JsonValue {
    let object: Map<String, JsonValue> = map
        .sorted_desc()
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), JsonValue::from(count)))
        .collect();
    JsonValue::Object(object)
}

/// CSV with a `tag,frequency` header, most frequent first.
pub fn to_csv(map: &TagFrequencyMap) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + map.len() * 16);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for (tag, count) in map.sorted_desc() {
        out.push_str(&csv_field(tag));
        out.push(',');
        out.push_str(&count.to_string());
        out.push('\n');
    }
    out
}

// RFC 4180: quote fields containing a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagFrequencyMap {
        [("b", 2u64), ("z", 5), ("c", 2)].into_iter().collect()
    }

    #[test]
    fn test_json_descending_order() {
        let json = to_json(&sample());
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "b", "c"]);
        assert_eq!(json["z"], 5);
    }

    #[test]
    fn test_csv_layout() {
        assert_eq!(to_csv(&sample()), "tag,frequency\nz,5\nb,2\nc,2\n");
    }

    #[test]
    fn test_csv_quotes_special_fields() {
        let map: TagFrequencyMap = [("smith, j", 1u64), ("say \"hi\"", 1)].into_iter().collect();
        let csv = to_csv(&map);
        assert!(csv.contains("\"smith, j\",1"));
        assert!(csv.contains("\"say \"\"hi\"\"\",1"));
    }

    #[test]
    fn test_empty_map_header_only() {
        assert_eq!(to_csv(&TagFrequencyMap::new()), "tag,frequency\n");
        assert_eq!(to_json(&TagFrequencyMap::new()), serde_json::json!({}));
    }
}
