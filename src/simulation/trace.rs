use smallvec::SmallVec;

use crate::trace::TraceRecord;

// A single handler emits at most a couple of records per tick
pub(crate) type TraceList = SmallVec<[TraceRecord; 2]>;
