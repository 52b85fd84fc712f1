//! Fallible accessors over tinyjson values.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use tinyjson::JsonValue;

use super::ImportError;

pub type Object = HashMap<String, JsonValue>;

static EMPTY: [JsonValue; 0] = [];

pub fn as_object<'a>(value: &'a JsonValue, what: &str) -> Result<&'a Object, ImportError> {
    value
        .get::<Object>()
        .ok_or_else(|| ImportError::parse(format!("{what} is not an object")))
}

/// The array under `key`, or an empty slice if the key is absent.
pub fn array<'a>(object: &'a Object, key: &str) -> Result<&'a [JsonValue], ImportError> {
    match object.get(key) {
        Some(value) => value
            .get::<Vec<JsonValue>>()
            .map(Vec::as_slice)
            .ok_or_else(|| ImportError::parse(format!("\"{key}\" is not an array"))),
        None => Ok(&EMPTY),
    }
}

/// The objects of the array under `key`, or an empty list if absent.
pub fn objects<'a>(object: &'a Object, key: &str) -> Result<Vec<&'a Object>, ImportError> {
    array(object, key)?
        .iter()
        .enumerate()
        .map(|(i, value)| as_object(value, &format!("{key}[{i}]")))
        .collect()
}

pub fn object<'a>(object: &'a Object, key: &str) -> Result<Option<&'a Object>, ImportError> {
    object.get(key).map(|value| as_object(value, key)).transpose()
}

/// Return usize if the JsonValue is a non-negative integer.
pub fn take_usize(value: &JsonValue, what: &str) -> Result<usize, ImportError> {
    match value.get::<f64>() {
        Some(&n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(n as usize),
        _ => Err(ImportError::parse(format!(
            "{what} is not a non-negative integer"
        ))),
    }
}

pub fn usize_field(object: &Object, key: &str) -> Result<usize, ImportError> {
    let value = object
        .get(key)
        .ok_or_else(|| ImportError::parse(format!("missing required \"{key}\"")))?;
    take_usize(value, key)
}

pub fn opt_usize(object: &Object, key: &str) -> Result<Option<usize>, ImportError> {
    object.get(key).map(|value| take_usize(value, key)).transpose()
}

pub fn usize_list(object: &Object, key: &str) -> Result<Vec<usize>, ImportError> {
    array(object, key)?
        .iter()
        .map(|value| take_usize(value, key))
        .collect()
}

pub fn opt_f32(object: &Object, key: &str) -> Result<Option<f32>, ImportError> {
    object
        .get(key)
        .map(|value| {
            value
                .get::<f64>()
                .map(|&n| n as f32)
                .ok_or_else(|| ImportError::parse(format!("\"{key}\" is not a number")))
        })
        .transpose()
}

pub fn opt_bool(object: &Object, key: &str) -> Result<Option<bool>, ImportError> {
    object
        .get(key)
        .map(|value| {
            value
                .get::<bool>()
                .copied()
                .ok_or_else(|| ImportError::parse(format!("\"{key}\" is not a boolean")))
        })
        .transpose()
}

pub fn opt_str<'a>(object: &'a Object, key: &str) -> Result<Option<&'a str>, ImportError> {
    object
        .get(key)
        .map(|value| {
            value
                .get::<String>()
                .map(String::as_str)
                .ok_or_else(|| ImportError::parse(format!("\"{key}\" is not a string")))
        })
        .transpose()
}

pub fn opt_name(object: &Object) -> Result<Option<String>, ImportError> {
    Ok(opt_str(object, "name")?.map(String::from))
}

/// Return the N numbers of the array under `key`, if present.
pub fn opt_floats<const N: usize>(
    object: &Object,
    key: &str,
) -> Result<Option<[f32; N]>, ImportError> {
    let Some(value) = object.get(key) else {
        return Ok(None);
    };
    let wrong_shape = || ImportError::parse(format!("\"{key}\" is not an array of {N} numbers"));
    let values = value.get::<Vec<JsonValue>>().ok_or_else(wrong_shape)?;
    if values.len() != N {
        return Err(wrong_shape());
    }
    let mut floats = [0.0; N];
    for (float, value) in floats.iter_mut().zip(values) {
        *float = *value.get::<f64>().ok_or_else(wrong_shape)? as f32;
    }
    Ok(Some(floats))
}

/// The node's local transform: `matrix` if given, otherwise T * R * S.
pub fn local_transform(node: &Object) -> Result<Mat4, ImportError> {
    if let Some(matrix) = opt_floats::<16>(node, "matrix")? {
        return Ok(Mat4::from_cols_array(&matrix));
    }
    let translation = opt_floats::<3>(node, "translation")?
        .map(Vec3::from)
        .unwrap_or(Vec3::ZERO);
    let rotation = opt_floats::<4>(node, "rotation")?
        .map(|[x, y, z, w]| Quat::from_xyzw(x, y, z, w))
        .unwrap_or(Quat::IDENTITY);
    let scale = opt_floats::<3>(node, "scale")?
        .map(Vec3::from)
        .unwrap_or(Vec3::ONE);
    Ok(Mat4::from_scale_rotation_translation(scale, rotation, translation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> JsonValue {
        json.parse().unwrap()
    }

    #[test]
    fn missing_arrays_are_empty() {
        let value = parse(r#"{"a": [1, 2]}"#);
        let object = as_object(&value, "root").unwrap();
        assert_eq!(usize_list(object, "a").unwrap(), vec![1, 2]);
        assert!(array(object, "b").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_integer_indices() {
        let value = parse(r#"{"a": -1, "b": 1.5, "c": "x", "d": 3}"#);
        let object = as_object(&value, "root").unwrap();
        assert!(usize_field(object, "a").is_err());
        assert!(usize_field(object, "b").is_err());
        assert!(usize_field(object, "c").is_err());
        assert!(usize_field(object, "missing").is_err());
        assert_eq!(usize_field(object, "d").unwrap(), 3);
    }

    #[test]
    fn trs_composes_translation_rotation_scale() {
        let value = parse(
            r#"{"translation": [1, 2, 3], "rotation": [0, 0.7071068, 0, 0.7071068], "scale": [2, 2, 2]}"#,
        );
        let node = as_object(&value, "node").unwrap();
        let transform = local_transform(node).unwrap();
        // +X scaled by 2, rotated 90° about Y to -Z, then translated.
        let p = transform.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5), "{p:?}");
    }

    #[test]
    fn matrix_is_column_major() {
        let value = parse(
            r#"{"matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 5,6,7,1], "translation": [9, 9, 9]}"#,
        );
        let node = as_object(&value, "node").unwrap();
        let transform = local_transform(node).unwrap();
        assert!(transform
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(5.0, 6.0, 7.0), 1e-6));
    }
}
