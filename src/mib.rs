//! Sorted variable map and the request semantics served from it.
//!
//! Lookups follow RFC 2741 §7.2.3: exact match for Get, lexicographic
//! successor for GetNext/GetBulk. Set requests run through the four phases
//! of §7.2.4 against a single in-flight `setlist`.

use std::{
    collections::BTreeMap,
    ops::Bound::{Excluded, Included, Unbounded},
    sync::Arc,
};

use crate::{
    error::ResponseError,
    oid::Oid,
    pdu::{GetBulkPdu, ResponsePdu, SearchRange},
    value::{Value, VarBind},
    variable::{lock, SharedVariable, TestResult},
};

/// Variables served by a session, keyed by instance OID.
#[derive(Default)]
pub struct VariableMap {
    variables: BTreeMap<Oid, SharedVariable>,
    /// Variables staged by the last successful TestSet, with their values.
    setlist: Vec<(SharedVariable, Value)>,
}

impl VariableMap {
    pub fn new() -> Self {
        VariableMap::default()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn contains(&self, oid: &Oid) -> bool {
        self.variables.contains_key(oid)
    }

    pub fn get_variable(&self, oid: &Oid) -> Option<&SharedVariable> {
        self.variables.get(oid)
    }

    /// Inserts or replaces the variable at `oid`.
    pub fn insert(&mut self, oid: Oid, variable: SharedVariable) -> Option<SharedVariable> {
        self.variables.insert(oid.with_include(false), variable)
    }

    pub fn remove(&mut self, oid: &Oid) -> Option<SharedVariable> {
        self.variables.remove(oid)
    }

    /// Instance OIDs in lexicographic order.
    pub fn oids(&self) -> impl Iterator<Item = &Oid> {
        self.variables.keys()
    }

    /// Drops every variable and any in-flight Set.
    pub fn clear(&mut self) {
        self.variables.clear();
        self.setlist.clear();
    }

    /// Number of variables touched by the in-flight Set.
    pub fn setlist_len(&self) -> usize {
        self.setlist.len()
    }

    /// First key in `range`, or `None` when the search runs past the end.
    fn successor(&self, range: &SearchRange) -> Option<(&Oid, &SharedVariable)> {
        let lower = if range.start.include() {
            Included(&range.start)
        } else {
            Excluded(&range.start)
        };
        let (oid, variable) = self.variables.range::<Oid, _>((lower, Unbounded)).next()?;
        if !range.end.is_null() && *oid >= range.end {
            return None;
        }
        Some((oid, variable))
    }

    /// Answers a Get (RFC 2741 §7.2.3.1).
    pub fn get(&self, names: &[Oid]) -> ResponsePdu {
        let mut response = ResponsePdu::default();
        for (i, name) in names.iter().enumerate() {
            let name = name.clone().with_include(false);
            let value = match self.variables.get(&name) {
                Some(variable) => match read(&name, variable) {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("Get {} failed: {}", name, e);
                        return gen_err(i);
                    }
                },
                None if self.variables.contains_key(&name.child(0)) => Value::NoSuchInstance,
                None => Value::NoSuchObject,
            };
            response.varbinds.push(VarBind::new(name, value));
        }
        response
    }

    /// Answers a GetNext (RFC 2741 §7.2.3.2).
    pub fn get_next(&self, ranges: &[SearchRange]) -> ResponsePdu {
        let mut response = ResponsePdu::default();
        for (i, range) in ranges.iter().enumerate() {
            match self.next_varbind(range) {
                Ok(vb) => response.varbinds.push(vb),
                Err(()) => return gen_err(i),
            }
        }
        response
    }

    /// Answers a GetBulk (RFC 2741 §7.2.3.3).
    ///
    /// Repeaters are returned repetition by repetition; each round resumes
    /// after the OID found by the previous one.
    pub fn get_bulk(&self, request: &GetBulkPdu) -> ResponsePdu {
        let mut response = ResponsePdu::default();
        let non_repeaters = (request.non_repeaters as usize).min(request.ranges.len());
        let (singles, repeaters) = request.ranges.split_at(non_repeaters);

        for (i, range) in singles.iter().enumerate() {
            match self.next_varbind(range) {
                Ok(vb) => response.varbinds.push(vb),
                Err(()) => return gen_err(i),
            }
        }

        let mut cursors: Vec<SearchRange> = repeaters.to_vec();
        let mut finished = vec![false; cursors.len()];
        for _ in 0..request.max_repetitions {
            if finished.iter().all(|&done| done) {
                break;
            }
            for (j, cursor) in cursors.iter_mut().enumerate() {
                let vb = if finished[j] {
                    VarBind::new(cursor.start.clone(), Value::EndOfMibView)
                } else {
                    match self.next_varbind(cursor) {
                        Ok(vb) => vb,
                        Err(()) => return gen_err(non_repeaters + j),
                    }
                };
                if vb.value == Value::EndOfMibView {
                    finished[j] = true;
                } else {
                    cursor.start = vb.oid.clone().with_include(false);
                }
                response.varbinds.push(vb);
            }
        }
        response
    }

    fn next_varbind(&self, range: &SearchRange) -> Result<VarBind, ()> {
        match self.successor(range) {
            Some((oid, variable)) => match read(oid, variable) {
                Ok(value) => Ok(VarBind::new(oid.clone(), value)),
                Err(e) => {
                    log::warn!("GetNext {} failed: {}", oid, e);
                    Err(())
                }
            },
            None => Ok(VarBind::new(
                range.start.clone().with_include(false),
                Value::EndOfMibView,
            )),
        }
    }

    /// Test phase. The setlist is replaced only if every binding passes.
    ///
    /// On rejection every variable this request staged is released again:
    /// variables of the in-flight setlist are re-staged with their earlier
    /// value, the others are cleaned up.
    pub fn test_set(&mut self, varbinds: &[VarBind]) -> ResponsePdu {
        let mut staged = Vec::with_capacity(varbinds.len());
        for (i, vb) in varbinds.iter().enumerate() {
            let result = match self.variables.get(&vb.oid) {
                Some(variable) => {
                    staged.push((variable.clone(), vb.value.clone()));
                    lock(variable).test(&vb.value)
                }
                None => TestResult::NotWritable,
            };
            if !result.is_ok() {
                log::debug!("TestSet {} rejected: {:?}", vb.oid, result);
                self.release(&staged);
                return ResponsePdu::error(result.into(), index(i));
            }
        }

        let abandoned = std::mem::replace(&mut self.setlist, staged);
        for (variable, _) in &abandoned {
            if self.in_setlist(variable).is_none() {
                lock(variable).cleanup();
            }
        }
        ResponsePdu::default()
    }

    fn in_setlist(&self, variable: &SharedVariable) -> Option<&Value> {
        self.setlist
            .iter()
            .find(|(staged, _)| Arc::ptr_eq(staged, variable))
            .map(|(_, value)| value)
    }

    /// Undoes the staging done by a rejected TestSet.
    fn release(&self, staged: &[(SharedVariable, Value)]) {
        for (variable, _) in staged {
            match self.in_setlist(variable) {
                Some(value) => {
                    lock(variable).test(value);
                }
                None => lock(variable).cleanup(),
            }
        }
    }

    /// Commit phase. Failures are reported, not rolled back.
    pub fn commit_set(&mut self) -> ResponsePdu {
        self.apply(|variable| lock(variable).commit(), ResponseError::CommitFailed)
    }

    /// Undo phase.
    pub fn undo_set(&mut self) -> ResponsePdu {
        self.apply(|variable| lock(variable).undo(), ResponseError::UndoFailed)
    }

    /// Cleanup phase; ends the transaction.
    pub fn cleanup_set(&mut self) {
        for (variable, _) in self.setlist.drain(..) {
            lock(&variable).cleanup();
        }
    }

    fn apply<F>(&self, mut phase: F, failure: ResponseError) -> ResponsePdu
    where
        F: FnMut(&SharedVariable) -> bool,
    {
        let mut response = ResponsePdu::default();
        for (i, (variable, _)) in self.setlist.iter().enumerate() {
            if !phase(variable) && response.error.is_ok() {
                response = ResponsePdu::error(failure, index(i));
            }
        }
        response
    }
}

/// Reads a variable for a response. Values that cannot be put on the wire
/// count as a failed read.
fn read(oid: &Oid, variable: &SharedVariable) -> crate::Result<Value> {
    oid.validate()?;
    let value = lock(variable).get()?;
    value.validate()?;
    Ok(value)
}

fn index(position: usize) -> u16 {
    u16::try_from(position + 1).unwrap_or(u16::MAX)
}

fn gen_err(position: usize) -> ResponsePdu {
    ResponsePdu::error(ResponseError::GenErr, index(position))
}
