pub(crate) use crate::boxes::FromBox;
pub(crate) use crate::error::{Error, Result};
pub(crate) use crate::movie::MovieContext;
pub(crate) use crate::mp4box::BoxReader;
pub(crate) use crate::serialize::{check_entries, BoxBytes, FromBytes, ReadBytes};
pub(crate) use crate::track::TrackContext;
pub(crate) use crate::types::*;
