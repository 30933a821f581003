use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::value::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("tag {0} is already registered")]
    DuplicateTag(u64),

    #[error("type {0} is already registered")]
    DuplicateType(&'static str),

    #[error("{0} is not a registered type extension")]
    TypeNotRegistered(&'static str),
}

/// Handler invoked for a tag id with no built-in semantics. The decoder is
/// positioned after the tag header; the handler reads the inner item and
/// produces the value it stands for.
pub type TagDecodeFn = fn(&mut Decoder) -> Result<Value, crate::decode::Error>;

/// Handler decoding one data item into a user type behind `dyn Any`.
pub type TypeDecodeFn = fn(&mut Decoder, &mut dyn Any) -> Result<(), crate::decode::Error>;

/// Handler encoding a user type behind `dyn Any` as one data item.
pub type TypeEncodeFn = fn(&dyn Any, &mut Encoder) -> Result<(), crate::encode::Error>;

static TAGS: OnceLock<RwLock<HashMap<u64, TagDecodeFn>>> = OnceLock::new();
static TYPES: OnceLock<RwLock<HashMap<TypeId, (TypeDecodeFn, TypeEncodeFn)>>> = OnceLock::new();

fn tags() -> &'static RwLock<HashMap<u64, TagDecodeFn>> {
    TAGS.get_or_init(Default::default)
}

fn types() -> &'static RwLock<HashMap<TypeId, (TypeDecodeFn, TypeEncodeFn)>> {
    TYPES.get_or_init(Default::default)
}

/// Registers a decode handler for a semantic tag id.
///
/// Registration is monotonic for the life of the process; binding an id
/// twice is an error.
pub fn register_tag(id: u64, f: TagDecodeFn) -> Result<(), Error> {
    let mut map = tags().write().unwrap_or_else(|e| e.into_inner());
    if map.contains_key(&id) {
        return Err(Error::DuplicateTag(id));
    }
    map.insert(id, f);
    Ok(())
}

pub(crate) fn lookup_tag(id: u64) -> Option<TagDecodeFn> {
    tags()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&id)
        .copied()
}

/// Registers a decode/encode handler pair for a user value type.
pub fn register_type<T: Any>(decode: TypeDecodeFn, encode: TypeEncodeFn) -> Result<(), Error> {
    let mut map = types().write().unwrap_or_else(|e| e.into_inner());
    let id = TypeId::of::<T>();
    if map.contains_key(&id) {
        return Err(Error::DuplicateType(std::any::type_name::<T>()));
    }
    map.insert(id, (decode, encode));
    Ok(())
}

pub(crate) fn lookup_type(id: TypeId) -> Option<(TypeDecodeFn, TypeEncodeFn)> {
    types()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&id)
        .copied()
}
