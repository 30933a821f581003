//! Record (struct-like) decode and encode over build-time field tables.
//!
//! A record is a destination with a declared set of named fields. On the
//! wire it is a map keyed by field name, or the legacy array shape where
//! odd-indexed entries are keys and even-indexed entries are values.

use crate::decode::{self, header_type_name, Decoder};
use crate::encode::{self, EncodeOptions, Encoder};
use crate::parser::Major;
use tracing::warn;

/// One entry of a record's field table.
///
/// `rename` is the external-name override used on the wire for both encode
/// and decode lookup; fields to be skipped are simply left out of the
/// table.
pub struct Field<T> {
    pub name: &'static str,
    pub rename: Option<&'static str>,
    pub decode: fn(&mut Decoder, &mut T) -> Result<(), decode::Error>,
    pub encode: fn(&T, &mut Encoder) -> Result<(), encode::Error>,
}

/// A struct-like destination with a static field table.
///
/// ```
/// use rill_cbor::record::{Field, Record};
///
/// #[derive(Default, PartialEq, Debug)]
/// struct Person {
///     name: String,
///     age: u8,
/// }
///
/// impl Record for Person {
///     const FIELDS: &'static [Field<Self>] = &[
///         Field {
///             name: "Name",
///             rename: None,
///             decode: |d, p| {
///                 p.name = d.decode()?;
///                 Ok(())
///             },
///             encode: |p, e| e.encode(&p.name),
///         },
///         Field {
///             name: "Age",
///             rename: Some("how_old"),
///             decode: |d, p| {
///                 p.age = d.decode()?;
///                 Ok(())
///             },
///             encode: |p, e| e.encode(&p.age),
///         },
///     ];
/// }
/// ```
pub trait Record: Default + 'static {
    const FIELDS: &'static [Field<Self>];
}

impl Decoder<'_> {
    /// Reads one data item into a record destination.
    ///
    /// Keys must be byte or text strings and are matched against each
    /// field's name and rename. Strict mode rejects unknown keys,
    /// duplicated keys and entry counts that do not match the field table;
    /// non-strict mode warns and skips, keeping the first assignment for
    /// duplicates. A key matching one field's name and a different field's
    /// rename is ambiguous and always fails.
    pub fn decode_record<T: Record>(&mut self) -> Result<T, decode::Error> {
        let (major, info) = self.parse()?;
        let legacy_array = match major {
            Major::Map => false,
            Major::Array => true,
            _ => {
                return Err(decode::Error::IncorrectType(
                    "map or array".to_string(),
                    header_type_name(major, info),
                ))
            }
        };
        self.descend(|d| {
            let mut out = T::default();
            let mut seen = vec![false; T::FIELDS.len()];
            if info != 31 {
                let len: usize = d.parser.buflen().try_into()?;
                if legacy_array && len % 2 != 0 {
                    return Err(decode::Error::PartialMap);
                }
                let entries = if legacy_array { len / 2 } else { len };
                if entries != T::FIELDS.len() {
                    if d.strict {
                        return Err(decode::Error::LengthMismatch {
                            fields: T::FIELDS.len(),
                            entries,
                        });
                    }
                    warn!(
                        fields = T::FIELDS.len(),
                        entries, "record entry count does not match field count"
                    );
                }
                for _ in 0..entries {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(decode::Error::UnexpectedBreak);
                    }
                    d.decode_record_entry(hdr, &mut out, &mut seen)?;
                }
            } else {
                loop {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        break;
                    }
                    d.decode_record_entry(hdr, &mut out, &mut seen)?;
                }
            }
            Ok(out)
        })
    }

    fn decode_record_entry<T: Record>(
        &mut self,
        (major, info): (Major, u8),
        out: &mut T,
        seen: &mut [bool],
    ) -> Result<(), decode::Error> {
        if !matches!(major, Major::Bytes | Major::Text) {
            return Err(decode::Error::NonStringKey(major));
        }
        let key = String::from_utf8(self.decode_string_payload((major, info))?)?;
        let mut matched = None;
        for (i, field) in T::FIELDS.iter().enumerate() {
            if field.name == key || field.rename == Some(key.as_str()) {
                if matched.is_some_and(|m| m != i) {
                    return Err(decode::Error::AmbiguousField(key));
                }
                matched = Some(i);
            }
        }
        let Some(i) = matched else {
            if self.strict {
                return Err(decode::Error::UnknownKey(key));
            }
            warn!(key = %key, "key does not match any record field, skipping");
            return self.skip_item();
        };
        if seen[i] {
            if self.strict {
                return Err(decode::Error::DuplicateKey(key));
            }
            warn!(key = %key, "duplicated record key, keeping the first value");
            return self.skip_item();
        }
        seen[i] = true;
        let field = &T::FIELDS[i];
        (field.decode)(self, out).map_err(|e| decode::Error::Field {
            field: field.name,
            source: Box::new(e),
        })
    }
}

impl Encoder<'_> {
    /// Writes a record as a map with one entry per table field, the field
    /// name (or its rename) as a text-string key.
    ///
    /// Entries are buffered first and flushed behind a header carrying the
    /// exact count; canonical mode orders them by encoded key bytes.
    pub fn encode_record<T: Record>(&mut self, value: &T) -> Result<(), encode::Error> {
        let options = EncodeOptions {
            canonical: self.is_canonical(),
            strict: self.is_strict(),
        };
        let mut entries = Vec::with_capacity(T::FIELDS.len());
        for field in T::FIELDS {
            let mut key_buf = Vec::new();
            Encoder::with_options(&mut key_buf, options)
                .composer()
                .compose_string(field.rename.unwrap_or(field.name))?;
            let mut value_buf = Vec::new();
            {
                let mut nested = Encoder::with_options(&mut value_buf, options);
                (field.encode)(value, &mut nested).map_err(|e| encode::Error::Record {
                    field: field.name,
                    source: Box::new(e),
                })?;
            }
            entries.push((key_buf, value_buf));
        }
        if options.canonical {
            entries.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));
        }
        self.composer()
            .compose_uint(Major::Map, T::FIELDS.len() as u64)?;
        for (key_buf, value_buf) in entries {
            self.composer().write_raw(&key_buf)?;
            self.composer().write_raw(&value_buf)?;
        }
        Ok(())
    }
}
