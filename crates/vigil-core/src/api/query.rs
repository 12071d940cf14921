// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asynchronous device query kinds.

/// The kind of an asynchronous query. At most one query of each kind runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Elapsed GPU time in nanoseconds.
    TimeElapsed,
    /// Number of samples passing the depth test.
    SamplesPassed,
    /// Whether any sample passed the depth test.
    AnySamplesPassed,
}

impl QueryKind {
    /// All query kinds.
    pub const ALL: [QueryKind; 3] = [
        QueryKind::TimeElapsed,
        QueryKind::SamplesPassed,
        QueryKind::AnySamplesPassed,
    ];

    /// Returns the index of this kind in [`QueryKind::ALL`].
    pub const fn index(self) -> usize {
        match self {
            QueryKind::TimeElapsed => 0,
            QueryKind::SamplesPassed => 1,
            QueryKind::AnySamplesPassed => 2,
        }
    }
}
