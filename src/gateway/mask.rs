use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Masked;

pub trait MaskPolicy {
    fn mask(value: &str) -> String;
}

impl MaskPolicy for Masked {
    fn mask(value: &str) -> String {
        let len = value.len();
        if len > 4 {
            "*".repeat(len - 4) + &value[len - 4..]
        } else {
            value.to_string()
        }
    }
}

/// Return true if a key name likely holds a subscriber phone number.
fn is_msisdn_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k == "number" || k == "client" || k.contains("phone") || k.contains("msisdn")
}

/// Return true if a key name likely holds credential or token material.
fn is_secret_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k == "access"
        || k == "refresh"
        || k.contains("secret")
        || k.contains("token")
        || k.contains("password")
}

pub fn secure_serializable(v: impl Serialize) -> serde_json::Value {
    let value = serde_json::to_value(v).expect("serialization is infallible");
    secure_value(&value)
}

pub fn secure_value(v: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match v {
        Value::Object(map) => {
            let mut new = serde_json::Map::with_capacity(map.len());
            for (k, val) in map {
                let is_msisdn = is_msisdn_key(k);
                let is_secret = is_secret_key(k);
                let new_val = match val {
                    Value::String(_) if is_secret => Value::String("***".to_string()),
                    Value::String(s) if is_msisdn => Value::String(Masked::mask(s)),
                    Value::Number(n) if is_msisdn => {
                        let s = n.to_string();
                        Value::String(Masked::mask(&s))
                    }
                    _ => secure_value(val),
                };
                new.insert(k.clone(), new_val);
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(secure_value).collect()),
        // primitives that are not objects: leave them as-is
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::secure_value;

    #[test]
    fn masks_phone_numbers_keeping_last_digits() {
        let masked = secure_value(&json!({
            "amount": 1000.0,
            "number": "250788123456",
        }));
        assert_eq!(masked["amount"], 1000.0);
        assert_eq!(masked["number"], "********3456");
    }

    #[test]
    fn redacts_credential_material_entirely() {
        let masked = secure_value(&json!({
            "client_id": "app-id",
            "client_secret": "s3cret",
            "access": "tkn-access",
            "refresh": "tkn-refresh",
        }));
        assert_eq!(masked["client_id"], "app-id");
        assert_eq!(masked["client_secret"], "***");
        assert_eq!(masked["access"], "***");
        assert_eq!(masked["refresh"], "***");
    }

    #[test]
    fn walks_nested_objects_and_arrays() {
        let masked = secure_value(&json!({
            "transactions": [
                { "ref": "abc", "client": "0788123456", "metadata": { "phone": 250788123456u64 } },
            ],
        }));
        let txn = &masked["transactions"][0];
        assert_eq!(txn["ref"], "abc");
        assert_eq!(txn["client"], "******3456");
        assert_eq!(txn["metadata"]["phone"], "********3456");
    }
}
