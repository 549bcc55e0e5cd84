use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// 대소문자 무관 JSON 디코딩
///
/// 기회 프로듀서와 가스 오라클은 camelCase, PascalCase, snake_case 키를
/// 섞어 보낸다. 필드별 alias 대신 직렬화 계층에서 키를 snake_case로
/// 정규화한 뒤 역직렬화한다. 알 수 없는 필드는 무시된다.
pub fn decode_lenient<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let value: Value = serde_json::from_slice(bytes)?;
    Ok(serde_json::from_value(normalize_keys(value))?)
}

/// 모든 오브젝트 키를 재귀적으로 snake_case로 변환
fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::with_capacity(map.len());
            for (key, inner) in map {
                normalized.insert(to_snake_case(&key), normalize_keys(inner));
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// camelCase / PascalCase / SCREAMING_SNAKE → snake_case
///
/// 약어 런("estimatedCostUSD")도 올바르게 분절되어야 한다.
fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else {
            out.push(c);
        }
    }

    // 중복 언더스코어 정리 ("__" → "_")
    let mut cleaned = String::with_capacity(out.len());
    let mut last_underscore = false;
    for c in out.chars() {
        if c == '_' {
            if !last_underscore && !cleaned.is_empty() {
                cleaned.push(c);
            }
            last_underscore = true;
        } else {
            cleaned.push(c);
            last_underscore = false;
        }
    }
    cleaned.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        gas_price_gwei: f64,
        gas_limit: u64,
        estimated_cost_usd: f64,
    }

    #[test]
    fn test_snake_case_conversion() {
        assert_eq!(to_snake_case("gasPriceGwei"), "gas_price_gwei");
        assert_eq!(to_snake_case("GasLimit"), "gas_limit");
        assert_eq!(to_snake_case("estimatedCostUSD"), "estimated_cost_usd");
        assert_eq!(to_snake_case("AOIScore"), "aoi_score");
        assert_eq!(to_snake_case("chain_name"), "chain_name");
        assert_eq!(to_snake_case("minProfit"), "min_profit");
    }

    #[test]
    fn test_camel_case_payload() {
        let payload = br#"{"gasPriceGwei": 50.0, "gasLimit": 300000, "estimatedCostUsd": 25.0}"#;
        let decoded: Sample = decode_lenient(payload).unwrap();
        assert_eq!(decoded.gas_limit, 300_000);
        assert_eq!(decoded.gas_price_gwei, 50.0);
    }

    #[test]
    fn test_pascal_case_payload() {
        let payload = br#"{"GasPriceGwei": 80.0, "GasLimit": 400000, "EstimatedCostUsd": 40.0}"#;
        let decoded: Sample = decode_lenient(payload).unwrap();
        assert_eq!(decoded.gas_limit, 400_000);
    }

    #[test]
    fn test_snake_case_passthrough() {
        let payload = br#"{"gas_price_gwei": 1.0, "gas_limit": 21000, "estimated_cost_usd": 0.5}"#;
        let decoded: Sample = decode_lenient(payload).unwrap();
        assert_eq!(decoded.gas_limit, 21_000);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let payload =
            br#"{"gasPriceGwei": 1.0, "gasLimit": 1, "estimatedCostUsd": 1.0, "somethingNew": true}"#;
        assert!(decode_lenient::<Sample>(payload).is_ok());
    }

    #[test]
    fn test_nested_objects_normalized() {
        #[derive(Deserialize)]
        struct Outer {
            inner_value: Inner,
        }
        #[derive(Deserialize)]
        struct Inner {
            some_field: u32,
        }

        let payload = br#"{"InnerValue": {"SomeField": 7}}"#;
        let decoded: Outer = decode_lenient(payload).unwrap();
        assert_eq!(decoded.inner_value.some_field, 7);
    }
}
