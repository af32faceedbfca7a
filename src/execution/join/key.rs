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

//! Canonical equality-key encoding.
//!
//! A row's equality key is the concatenation of its equality columns,
//! widened to the canonical representative of each type family and encoded
//! into an equality-stable byte string: two rows match iff both produce a
//! key and the keys are byte-equal. NULL in any equality column means the
//! row produces no key at all — three-valued logic, NULL matches nothing.

use crate::errors::EngineError;
use crate::types::value::DataValue;

pub(crate) type BumpBytes<'bump> = bumpalo::collections::Vec<'bump, u8>;

const ENCODE_GROUP_SIZE: usize = 8;
const ENCODE_MARKER: u8 = 0xFF;

macro_rules! encode_u {
    ($b:ident, $u:expr) => {
        $b.extend_from_slice(&$u.to_be_bytes())
    };
}

/// Appends the key for `values` projected through `eq_cols` to `buf`.
/// Returns `false` without touching `buf` when any projected value is NULL.
pub(crate) fn encode_equality_key(
    values: &[DataValue],
    eq_cols: &[usize],
    buf: &mut BumpBytes,
) -> Result<bool, EngineError> {
    if eq_cols.iter().any(|&i| values[i].is_null()) {
        return Ok(false);
    }
    for &i in eq_cols {
        encode_value(&values[i].widened(), buf);
    }
    Ok(true)
}

fn encode_value(value: &DataValue, b: &mut BumpBytes) {
    // Leading type tag keeps values of different families from colliding
    // when keys are concatenated.
    b.push(type_tag(value));
    match value {
        DataValue::Null => unreachable!("NULL values never reach key encoding"),
        DataValue::Boolean(v) => b.push(if *v { b'1' } else { b'0' }),
        // widened() has already folded the narrower widths away
        DataValue::Int8(v) => encode_u!(b, (*v as u8) ^ 0x80_u8),
        DataValue::Int16(v) => encode_u!(b, (*v as u16) ^ 0x8000_u16),
        DataValue::Int32(v) | DataValue::Date32(v) => {
            encode_u!(b, (*v as u32) ^ 0x8000_0000_u32)
        }
        DataValue::Int64(v) => encode_u!(b, (*v as u64) ^ 0x8000_0000_0000_0000_u64),
        DataValue::Float32(f) => {
            let mut u = f.to_bits();
            if f.0 >= 0_f32 {
                u |= 0x8000_0000_u32;
            } else {
                u = !u;
            }
            encode_u!(b, u);
        }
        DataValue::Float64(f) => {
            let mut u = f.to_bits();
            if f.0 >= 0_f64 {
                u |= 0x8000_0000_0000_0000_u64;
            } else {
                u = !u;
            }
            encode_u!(b, u);
        }
        DataValue::Utf8(v) => encode_string(b, v.as_bytes()),
        DataValue::Decimal(v) => {
            encode_u!(b, (v.mantissa() as u128) ^ (1_u128 << 127));
            b.push(v.scale() as u8);
        }
    }
}

fn type_tag(value: &DataValue) -> u8 {
    match value {
        DataValue::Null => 0,
        DataValue::Boolean(_) => 1,
        DataValue::Int8(_) | DataValue::Int16(_) | DataValue::Int32(_) | DataValue::Int64(_) => 2,
        DataValue::Float32(_) | DataValue::Float64(_) => 3,
        DataValue::Utf8(_) => 4,
        DataValue::Date32(_) => 5,
        DataValue::Decimal(_) => 6,
    }
}

// Bytes are written in 8-byte groups, each followed by a marker recording
// how much padding the group carries, so a string's end is unambiguous even
// mid-key. Refer:
// https://github.com/facebook/mysql-5.6/wiki/MyRocks-record-format#memcomparable-format
fn encode_string(b: &mut BumpBytes, data: &[u8]) {
    let d_len = data.len();
    let needed_groups = d_len / ENCODE_GROUP_SIZE + 1;
    b.reserve(needed_groups * (ENCODE_GROUP_SIZE + 1));

    let mut idx = 0;
    loop {
        let remain = d_len.saturating_sub(idx);

        if remain >= ENCODE_GROUP_SIZE {
            b.extend_from_slice(&data[idx..idx + ENCODE_GROUP_SIZE]);
            b.push(ENCODE_MARKER);
            idx += ENCODE_GROUP_SIZE;
            continue;
        }

        let pad_count = ENCODE_GROUP_SIZE - remain;
        if remain > 0 {
            b.extend_from_slice(&data[idx..]);
        }
        for _ in 0..pad_count {
            b.push(0);
        }
        b.push(ENCODE_MARKER - pad_count as u8);
        break;
    }
}
