//! Typed ID definitions for provider resources.

use crate::define_id;

define_id!(ImageId, "ami");
define_id!(SnapshotId, "snap");
