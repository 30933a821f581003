#![cfg(test)]
use super::decode::{Decode, DecodeOptions, Decoder, Error};
use super::parser;
use super::record::{Field, Record};
use super::registry;
use super::value::{Bytes, Mime, Value};
use base64::prelude::*;
use hex_literal::hex;
use num_bigint::BigInt;
use num_rational::BigRational;
use std::collections::HashMap;
use time::macros::datetime;
use time::OffsetDateTime;
use url::Url;

fn decode_one<T: Decode>(data: &[u8]) -> Result<T, Error> {
    let mut src: &[u8] = data;
    Decoder::new(&mut src).decode::<T>()
}

fn decode_with<T: Decode>(data: &[u8], options: DecodeOptions) -> Result<T, Error> {
    let mut src: &[u8] = data;
    Decoder::with_options(&mut src, options).decode::<T>()
}

fn strict() -> DecodeOptions {
    DecodeOptions {
        strict: true,
        ..Default::default()
    }
}

fn test_simple<T>(expected: T, data: &[u8])
where
    T: Decode + PartialEq + std::fmt::Debug,
{
    assert_eq!(decode_one::<T>(data).unwrap(), expected);
}

fn test_value(expected: Value, data: &[u8]) {
    assert_eq!(decode_one::<Value>(data).unwrap(), expected);
}

#[derive(Default, Debug, PartialEq)]
struct Ledger {
    fun: bool,
    amt: i8,
}

impl Record for Ledger {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "Fun",
            rename: None,
            decode: |d, r| {
                r.fun = d.decode()?;
                Ok(())
            },
            encode: |r, e| e.encode(&r.fun),
        },
        Field {
            name: "Amt",
            rename: None,
            decode: |d, r| {
                r.amt = d.decode()?;
                Ok(())
            },
            encode: |r, e| e.encode(&r.amt),
        },
    ];
}

fn decode_record<T: Record>(data: &[u8], options: DecodeOptions) -> Result<T, Error> {
    let mut src: &[u8] = data;
    Decoder::with_options(&mut src, options).decode_record::<T>()
}

#[test]
fn rfc_integers() {
    // RFC 7049, Appendix A. Typed destinations follow the argument width.
    test_simple(0u8, &hex!("00"));
    test_simple(1u8, &hex!("01"));
    test_simple(10u8, &hex!("0a"));
    test_simple(23u8, &hex!("17"));
    test_simple(24u8, &hex!("1818"));
    test_simple(25u8, &hex!("1819"));
    test_simple(100u8, &hex!("1864"));
    test_simple(1000u16, &hex!("1903e8"));
    test_simple(1000000u32, &hex!("1a000f4240"));
    test_simple(1000000000000u64, &hex!("1b000000e8d4a51000"));
    test_simple(18446744073709551615u64, &hex!("1bffffffffffffffff"));
    test_simple(-1i8, &hex!("20"));
    test_simple(-10i8, &hex!("29"));
    test_simple(-100i8, &hex!("3863"));
    test_simple(-1000i16, &hex!("3903e7"));
    test_simple(-2i64, &hex!("3b0000000000000001"));
}

#[test]
fn unsigned_byte_argument() {
    test_simple(111u8, &hex!("186f"));
    assert!(matches!(
        decode_one::<i8>(&hex!("186f")),
        Err(Error::IncorrectType(expected, found))
            if expected == "signed 8-bit integer" && found == "unsigned 8-bit integer"
    ));
}

#[test]
fn negative_two_byte_argument() {
    test_simple(-17836i16, &hex!("3945ab"));
}

#[test]
fn signed_overflow_is_an_error() {
    // -1 - 0xFF does not fit an i8; the argument is never bit-flipped into
    // range.
    assert!(matches!(
        decode_one::<i8>(&hex!("38ff")),
        Err(Error::IntOverflow(_))
    ));
    assert!(matches!(
        decode_one::<i64>(&hex!("3bffffffffffffffff")),
        Err(Error::IntOverflow(_))
    ));
}

#[test]
fn rfc_floats() {
    test_simple(half::f16::from_f32(0.0), &hex!("f90000"));
    test_simple(half::f16::from_f32(1.5), &hex!("f93e00"));
    test_simple(half::f16::from_f32(65504.0), &hex!("f97bff"));
    test_simple(half::f16::from_f32(5.960464477539063e-8), &hex!("f90001"));
    test_simple(half::f16::INFINITY, &hex!("f97c00"));
    test_simple(half::f16::NEG_INFINITY, &hex!("f9fc00"));
    assert!(decode_one::<half::f16>(&hex!("f97e00")).unwrap().is_nan());
    test_simple(100000.0f32, &hex!("fa47c35000"));
    test_simple(3.4028234663852886e+38f32, &hex!("fa7f7fffff"));
    test_simple(1.1f64, &hex!("fb3ff199999999999a"));
    test_simple(1.0e+300f64, &hex!("fb7e37e43c8800759c"));
    test_simple(156.457851f64, &hex!("fb40638ea6b723ee1c"));
}

#[test]
fn float_width_is_checked() {
    assert!(matches!(
        decode_one::<f64>(&hex!("fa47c35000")),
        Err(Error::IncorrectType(..))
    ));
    assert!(matches!(
        decode_one::<f32>(&hex!("f93e00")),
        Err(Error::IncorrectType(..))
    ));
}

#[test]
fn booleans_and_strings() {
    test_simple(false, &hex!("f4"));
    test_simple(true, &hex!("f5"));
    test_simple(String::new(), &hex!("60"));
    test_simple("IETF".to_string(), &hex!("6449455446"));
    test_simple("\u{6c34}".to_string(), &hex!("63e6b0b4"));
    test_simple(Bytes(hex!("01020304").to_vec()), &hex!("4401020304"));
    assert!(matches!(
        decode_one::<Bytes>(&hex!("6449455446")),
        Err(Error::IncorrectType(..))
    ));
}

#[test]
fn indefinite_strings() {
    // "bytes string" + " xD", chunked.
    test_simple(
        Bytes(b"bytes string xD".to_vec()),
        &hex!("5f 4c 62797465732073747269 6e67 43 207844 ff"),
    );
    test_simple(
        "streaming".to_string(),
        &hex!("7f 65 7374726561 64 6d696e67 ff"),
    );
}

#[test]
fn indefinite_chunks_must_match_major() {
    // A text chunk inside an indefinite byte string.
    assert!(matches!(
        decode_one::<Bytes>(&hex!("5f 6161 ff")),
        Err(Error::InvalidChunk)
    ));
    // Chunks must carry definite lengths.
    assert!(matches!(
        decode_one::<Bytes>(&hex!("5f 5f 4101 ff ff")),
        Err(Error::InvalidChunk)
    ));
}

#[test]
fn ill_formed_headers() {
    for byte in [0x1cu8, 0x1d, 0x1e] {
        assert!(matches!(
            decode_one::<Value>(&[byte]),
            Err(Error::Parse(parser::Error::InvalidInfo(28..=30)))
        ));
    }
    // Indefinite lengths are rejected for integers and tags.
    assert!(matches!(
        decode_one::<Value>(&hex!("1f")),
        Err(Error::Parse(parser::Error::InvalidIndefinite(
            parser::Major::Unsigned
        )))
    ));
    assert!(matches!(
        decode_one::<Value>(&hex!("3f")),
        Err(Error::Parse(parser::Error::InvalidIndefinite(
            parser::Major::Negative
        )))
    ));
    assert!(matches!(
        decode_one::<Value>(&hex!("df")),
        Err(Error::Parse(parser::Error::InvalidIndefinite(
            parser::Major::Tag
        )))
    ));
    assert!(matches!(
        decode_one::<Value>(&hex!("ff")),
        Err(Error::UnexpectedBreak)
    ));
    assert!(matches!(
        decode_one::<u16>(&hex!("19 01")),
        Err(Error::Parse(parser::Error::ShortRead { wanted: 2, got: 1 }))
    ));
}

#[test]
fn blind_values() {
    test_value(Value::U8(0), &hex!("00"));
    test_value(Value::U8(111), &hex!("186f"));
    test_value(Value::U16(1000), &hex!("1903e8"));
    test_value(Value::I8(-10), &hex!("29"));
    test_value(Value::I16(-17836), &hex!("3945ab"));
    test_value(Value::Null, &hex!("f6"));
    test_value(Value::Undefined, &hex!("f7"));
    test_value(Value::Bool(true), &hex!("f5"));
    test_value(Value::F32(100000.0), &hex!("fa47c35000"));
    test_value(Value::Text("a".to_string()), &hex!("6161"));
    test_value(Value::Bytes(hex!("01020304").to_vec()), &hex!("4401020304"));
    test_value(
        Value::Array(vec![Value::U8(1), Value::U8(2), Value::U8(3)]),
        &hex!("83010203"),
    );
    test_value(
        Value::Array(vec![
            Value::U8(1),
            Value::Array(vec![Value::U8(2), Value::U8(3)]),
            Value::Array(vec![Value::U8(4), Value::U8(5)]),
        ]),
        &hex!("8301820203820405"),
    );
    test_value(
        Value::Map(vec![
            (Value::Text("a".to_string()), Value::U8(1)),
            (
                Value::Text("b".to_string()),
                Value::Array(vec![Value::U8(2), Value::U8(3)]),
            ),
        ]),
        &hex!("a26161016162820203"),
    );
    // Indefinite containers end on the break byte.
    test_value(Value::Array(vec![]), &hex!("9fff"));
    test_value(
        Value::Array(vec![
            Value::U8(1),
            Value::Array(vec![Value::U8(2), Value::U8(3)]),
            Value::Array(vec![Value::U8(4), Value::U8(5)]),
        ]),
        &hex!("9f018202039f0405ffff"),
    );
    test_value(
        Value::Map(vec![(Value::Text("a".to_string()), Value::U8(1))]),
        &hex!("bf616101ff"),
    );
}

#[test]
fn simple_values_are_unsupported() {
    assert!(matches!(
        decode_one::<Value>(&hex!("f0")),
        Err(Error::UnsupportedSimple(16))
    ));
    assert!(matches!(
        decode_one::<Value>(&hex!("f8ff")),
        Err(Error::UnsupportedSimple(255))
    ));
}

#[test]
fn partial_maps_are_rejected() {
    assert!(matches!(
        decode_one::<Value>(&hex!("bf6161ff")),
        Err(Error::PartialMap)
    ));
}

#[test]
fn typed_containers() {
    test_simple(vec![1u8, 2, 3], &hex!("83010203"));
    test_simple(Vec::<u8>::new(), &hex!("80"));
    test_simple(vec![-1i8, -2], &hex!("822021"));
    test_simple(vec![vec![1u8], vec![2u8]], &hex!("8281018102"));

    let m: HashMap<String, u8> = decode_one(&hex!("a2616101616202")).unwrap();
    assert_eq!(m.len(), 2);
    assert_eq!(m["a"], 1);
    assert_eq!(m["b"], 2);

    let m: HashMap<String, u8> = decode_one(&hex!("bf616101ff")).unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m["a"], 1);
}

#[test]
fn map_duplicate_keys() {
    // Non-strict decode overwrites; strict mode rejects.
    let m: HashMap<String, u8> = decode_one(&hex!("a2616101616102")).unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m["a"], 2);
    // Blind decode overwrites the same way.
    assert_eq!(
        decode_one::<Value>(&hex!("a2616101616102")).unwrap(),
        Value::Map(vec![(Value::Text("a".to_string()), Value::U8(2))])
    );
    assert!(matches!(
        decode_with::<HashMap<String, u8>>(&hex!("a2616101616102"), strict()),
        Err(Error::DuplicateKey(_))
    ));
    assert!(matches!(
        decode_with::<Value>(&hex!("a2616101616102"), strict()),
        Err(Error::DuplicateKey(_))
    ));
}

#[test]
fn null_and_undefined_decode_into_options() {
    assert_eq!(decode_one::<Option<u8>>(&hex!("f6")).unwrap(), None);
    assert_eq!(decode_one::<Option<u8>>(&hex!("f7")).unwrap(), None);
    assert_eq!(decode_one::<Option<u8>>(&hex!("01")).unwrap(), Some(1));
    assert_eq!(
        decode_one::<Option<String>>(&hex!("6161")).unwrap(),
        Some("a".to_string())
    );
}

#[test]
fn recursion_depth_is_bounded() {
    let options = DecodeOptions {
        max_depth: 4,
        ..Default::default()
    };
    assert!(matches!(
        decode_with::<Value>(&hex!("818181818101"), options),
        Err(Error::MaxRecursion)
    ));
    assert!(decode_with::<Value>(&hex!("8181818101"), options).is_ok());
    // Nested unregistered tags are bounded by the same guard.
    assert!(matches!(
        decode_with::<Value>(&hex!("d863d863d86301"), options),
        Err(Error::MaxRecursion)
    ));
    assert!(decode_with::<Value>(&hex!("d863d86301"), options).is_ok());
}

#[test]
fn records_from_maps() {
    let ledger: Ledger =
        decode_record(&hex!("a2 63 46756e f5 63 416d74 21"), Default::default()).unwrap();
    assert_eq!(
        ledger,
        Ledger {
            fun: true,
            amt: -2
        }
    );

    // The same record in the legacy array shape, keys at odd positions.
    let ledger: Ledger =
        decode_record(&hex!("84 63 46756e f5 63 416d74 21"), Default::default()).unwrap();
    assert_eq!(
        ledger,
        Ledger {
            fun: true,
            amt: -2
        }
    );

    // And from an indefinite map.
    let ledger: Ledger =
        decode_record(&hex!("bf 63 46756e f5 63 416d74 21 ff"), Default::default()).unwrap();
    assert!(ledger.fun);
}

#[test]
fn record_strict_mode() {
    // Unknown key.
    assert!(matches!(
        decode_record::<Ledger>(&hex!("a2 63 46756e f5 63 5a7a7a 21"), strict()),
        Err(Error::UnknownKey(key)) if key == "Zzz"
    ));
    // Non-strict mode skips it and leaves the field defaulted.
    let ledger: Ledger =
        decode_record(&hex!("a2 63 46756e f5 63 5a7a7a 21"), Default::default()).unwrap();
    assert_eq!(
        ledger,
        Ledger {
            fun: true,
            amt: 0
        }
    );

    // Duplicated key: strict fails, non-strict keeps the first value.
    assert!(matches!(
        decode_record::<Ledger>(&hex!("a2 63 46756e f5 63 46756e f4"), strict()),
        Err(Error::DuplicateKey(key)) if key == "Fun"
    ));
    let ledger: Ledger =
        decode_record(&hex!("a2 63 46756e f5 63 46756e f4"), Default::default()).unwrap();
    assert!(ledger.fun);

    // Entry count must match the field table.
    assert!(matches!(
        decode_record::<Ledger>(&hex!("a1 63 46756e f5"), strict()),
        Err(Error::LengthMismatch {
            fields: 2,
            entries: 1
        })
    ));

    // Keys must be strings.
    assert!(matches!(
        decode_record::<Ledger>(&hex!("a2 01 f5 02 21"), strict()),
        Err(Error::NonStringKey(parser::Major::Unsigned))
    ));
}

#[derive(Default, Debug, PartialEq)]
struct Renamed {
    inner: u8,
}

impl Record for Renamed {
    const FIELDS: &'static [Field<Self>] = &[Field {
        name: "Inner",
        rename: Some("alias"),
        decode: |d, r| {
            r.inner = d.decode()?;
            Ok(())
        },
        encode: |r, e| e.encode(&r.inner),
    }];
}

#[test]
fn record_renames() {
    // Both the declared name and the rename match on decode.
    let r: Renamed = decode_record(&hex!("a1 65 616c696173 07"), Default::default()).unwrap();
    assert_eq!(r.inner, 7);
    let r: Renamed = decode_record(&hex!("a1 65 496e6e6572 07"), Default::default()).unwrap();
    assert_eq!(r.inner, 7);
}

#[derive(Default, Debug, PartialEq)]
struct Tangled {
    a: u8,
    b: u8,
}

impl Record for Tangled {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "x",
            rename: None,
            decode: |d, r| {
                r.a = d.decode()?;
                Ok(())
            },
            encode: |r, e| e.encode(&r.a),
        },
        Field {
            name: "y",
            rename: Some("x"),
            decode: |d, r| {
                r.b = d.decode()?;
                Ok(())
            },
            encode: |r, e| e.encode(&r.b),
        },
    ];
}

#[test]
fn record_ambiguous_field() {
    // "x" names one field and renames another.
    assert!(matches!(
        decode_record::<Tangled>(&hex!("a2 6178 01 6179 02"), Default::default()),
        Err(Error::AmbiguousField(key)) if key == "x"
    ));
}

#[test]
fn bignums() {
    test_simple(
        "18446744073709551616".parse::<BigInt>().unwrap(),
        &hex!("c249010000000000000000"),
    );
    test_simple(
        "-18446744073709551617".parse::<BigInt>().unwrap(),
        &hex!("c349010000000000000000"),
    );
    test_simple(BigInt::from(0), &hex!("c240"));
    test_value(
        Value::BigNum("18446744073709551616".parse().unwrap()),
        &hex!("c249010000000000000000"),
    );
    // Tag 2 must wrap a byte string.
    assert!(matches!(
        decode_one::<BigInt>(&hex!("c26161")),
        Err(Error::TagContent(2, _))
    ));
}

#[test]
fn date_times() {
    // Tag 0: RFC 3339 text.
    test_simple(
        datetime!(2013-03-21 20:04:00 UTC),
        &hex!("c074323031332d30332d32315432303a30343a30305a"),
    );
    // Tag 1: integer epoch.
    test_simple(
        datetime!(2003-12-13 18:30:02 UTC),
        &hex!("c11a3fdb5aaa"),
    );
    test_simple(
        datetime!(2013-03-21 20:04:00 UTC),
        &hex!("c11a514b67b0"),
    );
    // Tag 1: float epoch keeps the fraction.
    test_simple(
        datetime!(2013-03-21 20:04:00.5 UTC),
        &hex!("c1fb41d452d9ec200000"),
    );
    // A bare text or integer item still decodes into a date-time target.
    test_simple(
        datetime!(2013-03-21 20:04:00 UTC),
        &hex!("74323031332d30332d32315432303a30343a30305a"),
    );
    test_simple(datetime!(2013-03-21 20:04:00 UTC), &hex!("1a514b67b0"));
    test_value(
        Value::DateTime(datetime!(2003-12-13 18:30:02 UTC)),
        &hex!("c11a3fdb5aaa"),
    );
    assert!(matches!(
        decode_one::<OffsetDateTime>(&hex!("c06161")),
        Err(Error::TagContent(0, _))
    ));
}

#[test]
fn decimal_fractions() {
    // [-2, 27315] = 273.15 as a single-precision float.
    test_simple(273.15f32, &hex!("c48221196ab3"));
    test_value(Value::F32(273.15), &hex!("c48221196ab3"));
    // Plain single-precision floats share the destination.
    test_simple(100000.0f32, &hex!("fa47c35000"));
    // Tag 4 carries exactly two elements.
    assert!(matches!(
        decode_one::<f32>(&hex!("c48121")),
        Err(Error::TagContent(4, _))
    ));
    assert!(matches!(
        decode_one::<f32>(&hex!("c4826161196ab3")),
        Err(Error::TagContent(4, _))
    ));
}

#[test]
fn big_floats() {
    // [-1, 3] = 3/2.
    test_simple(
        BigRational::new(BigInt::from(3), BigInt::from(2)),
        &hex!("c5822003"),
    );
    // A bignum mantissa: [2, 2^64] = 2^66.
    test_simple(
        BigRational::from(BigInt::from(1) << 66),
        &hex!("c58202c249010000000000000000"),
    );
    test_value(
        Value::Rational(BigRational::new(BigInt::from(3), BigInt::from(2))),
        &hex!("c5822003"),
    );
    assert!(matches!(
        decode_one::<BigRational>(&hex!("c5826161 03")),
        Err(Error::TagContent(5, _))
    ));
}

#[test]
fn expected_encoding_tags() {
    let payload = hex!("010203");
    test_value(
        Value::Base64Url(BASE64_URL_SAFE.encode(payload).into_bytes()),
        &hex!("d543010203"),
    );
    test_value(
        Value::Base64(BASE64_STANDARD.encode(hex!("0102")).into_bytes()),
        &hex!("d6420102"),
    );
    test_value(Value::Base16(b"01ff".to_vec()), &hex!("d74201ff"));
    // Tag 24 embeds a CBOR item as an opaque byte string.
    test_value(
        Value::Tag(24, Box::new(Value::Bytes(hex!("6449455446").to_vec()))),
        &hex!("d818456449455446"),
    );
}

#[test]
fn uri_tags() {
    test_value(
        Value::Url(Url::parse("http://www.example.com").unwrap()),
        &hex!("d82076687474703a2f2f7777772e6578616d706c652e636f6d"),
    );
    // Tag 33: base64url-encoded URI ("http://a/" -> "aHR0cDovL2Ev").
    test_value(
        Value::Url(Url::parse("http://a/").unwrap()),
        &hex!("d8216c6148523063446f764c324576"),
    );
    test_simple(
        Url::parse("http://www.example.com").unwrap(),
        &hex!("d82076687474703a2f2f7777772e6578616d706c652e636f6d"),
    );
    assert!(matches!(
        decode_one::<Url>(&hex!("d8206c6e6f742061207265616c2075")),
        Err(Error::TagContent(32, _))
    ));
}

#[test]
fn base64_text_tag() {
    // "aGVsbG8=" -> "hello"
    test_value(
        Value::Text("hello".to_string()),
        &hex!("d82268614756736247383d"),
    );
    test_simple("hello".to_string(), &hex!("d82268614756736247383d"));
    assert!(matches!(
        decode_one::<String>(&hex!("d8226161")),
        Err(Error::TagContent(34, _))
    ));
}

#[test]
fn regexp_tag() {
    let value = decode_one::<Value>(&hex!("d823645e612b24")).unwrap();
    match &value {
        Value::Regexp(re) => {
            assert!(re.is_match("aaa"));
            assert!(!re.is_match("b"));
        }
        other => panic!("expected a regexp, got {other:?}"),
    }
    assert!(matches!(
        decode_one::<regex::Regex>(&hex!("d8236328612b")),
        Err(Error::TagContent(35, _))
    ));
}

#[test]
fn mime_tag() {
    let expected = Mime::new("text/html").with_param("charset", "utf-8");
    test_simple(
        expected.clone(),
        &hex!("d8247818746578742f68746d6c3b20636861727365743d7574662d38"),
    );
    test_value(
        Value::Mime(expected),
        &hex!("d8247818746578742f68746d6c3b20636861727365743d7574662d38"),
    );
    assert!(matches!(
        decode_one::<Mime>(&hex!("d824656e6f706521")),
        Err(Error::TagContent(36, _))
    ));
}

#[test]
fn unknown_tags() {
    // Preserved in non-strict mode, rejected in strict mode.
    test_value(Value::Tag(99, Box::new(Value::U8(1))), &hex!("d86301"));
    assert!(matches!(
        decode_with::<Value>(&hex!("d86301"), strict()),
        Err(Error::UnknownTag(99))
    ));
}

fn decode_uuid_tag(d: &mut Decoder) -> Result<Value, Error> {
    let bytes: Bytes = d.decode()?;
    Ok(Value::Bytes(bytes.0))
}

#[test]
fn registered_tags_take_over() {
    registry::register_tag(37, decode_uuid_tag).unwrap();
    assert!(matches!(
        registry::register_tag(37, decode_uuid_tag),
        Err(registry::Error::DuplicateTag(37))
    ));
    test_value(
        Value::Bytes(hex!("000102030405060708090a0b0c0d0e0f").to_vec()),
        &hex!("d82550000102030405060708090a0b0c0d0e0f"),
    );
}

#[derive(Default, Debug, PartialEq)]
struct Fahrenheit(f64);

#[test]
fn registered_types_decode() {
    registry::register_type::<Fahrenheit>(
        |d, out| {
            let degrees: f64 = d.decode()?;
            *out.downcast_mut::<Fahrenheit>().unwrap() = Fahrenheit(degrees);
            Ok(())
        },
        |value, e| e.encode(&value.downcast_ref::<Fahrenheit>().unwrap().0),
    )
    .unwrap();

    let mut src: &[u8] = &hex!("fb3ff199999999999a");
    let v: Fahrenheit = Decoder::new(&mut src).decode_any().unwrap();
    assert_eq!(v, Fahrenheit(1.1));

    #[derive(Default)]
    struct Unregistered;
    let mut src: &[u8] = &hex!("00");
    assert!(matches!(
        Decoder::new(&mut src).decode_any::<Unregistered>(),
        Err(Error::Registry(registry::Error::TypeNotRegistered(_)))
    ));
}

#[test]
fn decode_is_a_single_item_operation() {
    let data = hex!("0102");
    let mut src: &[u8] = &data;
    let mut decoder = Decoder::new(&mut src);
    assert_eq!(decoder.decode::<u8>().unwrap(), 1);
    assert_eq!(decoder.decode::<u8>().unwrap(), 2);
    assert!(decoder.decode::<u8>().is_err());
}

#[test]
fn tagged_items_do_not_decode_into_plain_scalars() {
    assert!(matches!(
        decode_one::<u32>(&hex!("c11a514b67b0")),
        Err(Error::IncorrectType(_, found)) if found == "tagged value"
    ));
}
