//! SQL scalar functions for vector search.
//!
//! SQLite has no vector type, so embeddings are stored as little-endian
//! `f32` BLOBs and compared through functions registered on each connection:
//!
//! - `l2_distance(a BLOB, b BLOB) -> REAL`
//! - `exp_decay(age_days REAL, rate REAL) -> REAL`
//!
//! Both return NULL when any argument is NULL.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::embedding::Embedding;
use crate::retrieval::decay;

/// Name of the registered distance function.
pub const L2_DISTANCE: &str = "l2_distance";

/// Name of the registered decay function.
pub const EXP_DECAY: &str = "exp_decay";

/// Registers the vector functions on a connection.
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function(L2_DISTANCE, 2, flags, l2_distance)?;
    conn.create_scalar_function(EXP_DECAY, 2, flags, exp_decay)?;

    Ok(())
}

fn l2_distance(ctx: &Context<'_>) -> rusqlite::Result<Option<f64>> {
    let (Some(a), Some(b)) = (vector_arg(ctx, 0)?, vector_arg(ctx, 1)?) else {
        return Ok(None);
    };

    a.l2_distance(&b).map(Some).ok_or_else(|| {
        rusqlite::Error::UserFunctionError(
            format!(
                "{}: dimension mismatch ({} vs {})",
                L2_DISTANCE,
                a.dimension(),
                b.dimension()
            )
            .into(),
        )
    })
}

fn exp_decay(ctx: &Context<'_>) -> rusqlite::Result<Option<f64>> {
    let age: Option<f64> = ctx.get(0)?;
    let rate: Option<f64> = ctx.get(1)?;

    Ok(age.zip(rate).map(|(age, rate)| decay::decay_factor(age, rate)))
}

fn vector_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<Option<Embedding>> {
    match ctx.get_raw(idx) {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(bytes) => Embedding::from_le_bytes(bytes).map(Some).ok_or_else(|| {
            rusqlite::Error::UserFunctionError(
                format!("{}: BLOB length {} is not a multiple of 4", L2_DISTANCE, bytes.len())
                    .into(),
            )
        }),
        other => Err(rusqlite::Error::InvalidFunctionParameterType(
            idx,
            other.data_type(),
        )),
    }
}
