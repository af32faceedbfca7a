// Copyright 2025 rillsql
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

use std::fmt;
use std::fmt::Formatter;

pub(crate) mod container;
mod hash;
pub mod hash_join;
pub(crate) mod key;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum JoinType {
    Inner,
    LeftOuter,
    LeftSemi,
    LeftAnti,
    RightOuter,
    Full,
}

impl JoinType {
    /// Semi/anti joins retain only the left input's columns in their output.
    pub fn retains_left_only(&self) -> bool {
        matches!(self, JoinType::LeftSemi | JoinType::LeftAnti)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "Inner"),
            JoinType::LeftOuter => write!(f, "LeftOuter"),
            JoinType::LeftSemi => write!(f, "LeftSemi"),
            JoinType::LeftAnti => write!(f, "LeftAnti"),
            JoinType::RightOuter => write!(f, "RightOuter"),
            JoinType::Full => write!(f, "Full"),
        }
    }
}

/// A logical input of the join, as written in the query. Which side gets
/// stored is a runtime decision; logical sides are what the join semantics
/// are defined against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

pub fn joins_nullable(join_type: &JoinType) -> (bool, bool) {
    match join_type {
        JoinType::Inner => (false, false),
        JoinType::LeftOuter | JoinType::LeftSemi | JoinType::LeftAnti => (false, true),
        JoinType::RightOuter => (true, false),
        JoinType::Full => (true, true),
    }
}
