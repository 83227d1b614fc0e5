use crate::error::PqMiddlewareError;
use crate::input::{BindArrays, InputParameter, InputParameterVector};
use crate::types::{FieldType, ParamConverter, RowValues};

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Container for libpq parameters with lifetime tracking.
///
/// Blob values keep borrowing the `RowValues` they came from; everything
/// else is serialized to PostgreSQL's text input format.
#[derive(Debug, Clone, Default)]
pub struct Params<'a> {
    inputs: InputParameterVector<'a>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of `RowValues` to libpq parameters.
    ///
    /// # Errors
    /// Returns `PqMiddlewareError::JsonError` if a JSON value cannot be serialized.
    pub fn convert(params: &'a [RowValues]) -> Result<Params<'a>, PqMiddlewareError> {
        let mut inputs = Vec::with_capacity(params.len());
        for value in params {
            inputs.push(bind_value(value)?);
        }
        tracing::trace!(count = inputs.len(), "converted query parameters");
        Ok(Params { inputs })
    }

    #[must_use]
    pub fn as_inputs(&self) -> &[InputParameter<'a>] {
        &self.inputs
    }

    #[must_use]
    pub fn into_inputs(self) -> InputParameterVector<'a> {
        self.inputs
    }

    /// Lay the converted parameters out for `PQexecParams`.
    ///
    /// # Errors
    /// See [`BindArrays::from_parameters`].
    pub fn bind_arrays(&self) -> Result<BindArrays<'_>, PqMiddlewareError> {
        BindArrays::from_parameters(&self.inputs)
    }
}

impl<'a> ParamConverter<'a> for Params<'a> {
    type Converted = Params<'a>;

    fn convert_sql_params(params: &'a [RowValues]) -> Result<Self::Converted, PqMiddlewareError> {
        Self::convert(params)
    }
}

/// Serialize one value into an input parameter.
///
/// # Errors
/// Returns `PqMiddlewareError::JsonError` if a JSON value cannot be serialized.
pub fn bind_value(value: &RowValues) -> Result<InputParameter<'_>, PqMiddlewareError> {
    let mut input = InputParameter::new(FieldType::for_value(value), None);
    match value {
        RowValues::Int(i) => input.set_string_representation(i.to_string()),
        RowValues::Float(f) => input.set_string_representation(float_text(*f)),
        RowValues::Text(s) => input.set_string_representation(s.as_str()),
        RowValues::Bool(b) => input.set_string_representation(if *b { "true" } else { "false" }),
        RowValues::Timestamp(dt) => {
            input.set_string_representation(dt.format(TIMESTAMP_FORMAT).to_string());
        }
        RowValues::Date(d) => input.set_string_representation(d.format(DATE_FORMAT).to_string()),
        RowValues::Time(t) => input.set_string_representation(t.format(TIME_FORMAT).to_string()),
        RowValues::JSON(json) => input.set_string_representation(serde_json::to_string(json)?),
        RowValues::Blob(bytes) => input.set_non_string_representation(bytes),
        RowValues::Null => {}
    }
    Ok(input)
}

// PostgreSQL spells the non-finite floats differently from Rust's Display.
fn float_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn text_of<'p>(input: &'p InputParameter<'_>) -> &'p str {
        std::str::from_utf8(input.internal_representation().unwrap()).unwrap()
    }

    #[test]
    fn scalars_serialize_to_text() -> Result<(), PqMiddlewareError> {
        let values = vec![
            RowValues::Int(-17),
            RowValues::Float(1.5),
            RowValues::Bool(true),
            RowValues::Text("alice".into()),
        ];
        let params = Params::convert(&values)?;
        let inputs = params.as_inputs();

        assert_eq!(inputs[0].field_type(), FieldType::Int64);
        assert_eq!(text_of(&inputs[0]), "-17");
        assert_eq!(text_of(&inputs[1]), "1.5");
        assert_eq!(text_of(&inputs[2]), "true");
        assert_eq!(text_of(&inputs[3]), "alice");
        assert!(inputs.iter().all(|i| !i.is_binary()));
        Ok(())
    }

    #[test]
    fn non_finite_floats_use_postgres_spelling() {
        assert_eq!(float_text(f64::INFINITY), "Infinity");
        assert_eq!(float_text(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(float_text(f64::NAN), "NaN");
    }

    #[test]
    fn temporal_values_use_iso_formats() -> Result<(), PqMiddlewareError> {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let time = NaiveTime::from_hms_milli_opt(13, 5, 9, 250).unwrap();
        let values = vec![
            RowValues::Timestamp(date.and_time(time)),
            RowValues::Date(date),
            RowValues::Time(time),
        ];
        let params = Params::convert(&values)?;
        let inputs = params.as_inputs();

        assert_eq!(text_of(&inputs[0]), "2024-02-29 13:05:09.250");
        assert_eq!(inputs[0].field_type(), FieldType::DateTime);
        assert_eq!(text_of(&inputs[1]), "2024-02-29");
        assert_eq!(text_of(&inputs[2]), "13:05:09.250");
        Ok(())
    }

    #[test]
    fn blobs_borrow_and_nulls_bind_nothing() -> Result<(), PqMiddlewareError> {
        let values = vec![RowValues::Blob(vec![1, 2, 3]), RowValues::Null];
        let params = Params::convert(&values)?;
        let inputs = params.as_inputs();

        let blob = values[0].as_blob().unwrap();
        assert!(inputs[0].is_binary());
        assert!(std::ptr::eq(inputs[0].internal_representation().unwrap(), blob));
        assert_eq!(inputs[1].field_type(), FieldType::Null);
        assert!(inputs[1].internal_representation().is_none());

        let arrays = params.bind_arrays()?;
        assert!(arrays.value_pointers()[1].is_null());
        Ok(())
    }

    #[test]
    fn json_is_bound_as_compact_text() -> Result<(), PqMiddlewareError> {
        let values = vec![RowValues::JSON(serde_json::json!({"k": [1, 2]}))];
        let params = <Params as ParamConverter>::convert_sql_params(&values)?;
        assert_eq!(text_of(&params.as_inputs()[0]), r#"{"k":[1,2]}"#);
        Ok(())
    }
}
