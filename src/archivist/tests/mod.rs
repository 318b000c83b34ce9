use super::*;
use crate::archivist::test_helpers::*;
use crate::error::{ArchiveError, Error};
use crate::flickr::methods;
use crate::storage::MemoryStore;
use crate::types::ItemId;
