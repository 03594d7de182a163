use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::diag::Level;
use crate::error::RuntimeError;
use crate::executor::{Interpreter, Typed};
use crate::num;
use crate::vm::{self, EvalType, Mode};

impl<'a> Interpreter<'a> {
    /// Dispatch one standard verb. The returned offset is the cursor
    /// advance; only `cond` changes it from the passed-in value.
    pub(crate) fn execute_standard_verb(
        &mut self,
        name: &str,
        typed: Typed,
        desc: bool,
        do_list: &[String],
        for_list: &[String],
        offset: i32,
    ) -> (i32, Vec<String>) {
        let result: Result<Vec<String>, RuntimeError> = match name {
            "cond" => return self.verb_cond(do_list, offset),
            "del" => Ok(del_list(do_list, for_list)),
            "expand" => Ok(expand_list(do_list)),
            "file" => return (offset, self.verb_file(do_list, for_list)),
            "find" => Ok(find_list(do_list, for_list)),
            "freq" => freq_list(do_list, for_list),
            "get" => get_list(do_list, for_list),
            "id" => Ok(do_list.to_vec()),
            "include" => Ok(Vec::new()),
            "input" => return (offset, self.verb_input(do_list)),
            "ins" => ins_list(do_list, for_list),
            "join" => Ok(join_list(do_list, for_list)),
            "mask" => mask_list(do_list, for_list),
            "minus" => Ok(minus_list(do_list, for_list)),
            "output" => {
                self.do_out(do_list);
                self.echo_to_log(do_list);
                Ok(do_list.to_vec())
            }
            "pexpr" => {
                let (diag, stop, extended) = self.vm_parts();
                Ok(vm::eval(
                    Mode::Single,
                    typed.eval_type(),
                    do_list,
                    &[],
                    &[],
                    &[],
                    extended,
                    diag,
                    stop,
                ))
            }
            "print" => {
                self.do_print(do_list);
                self.echo_to_log(do_list);
                Ok(do_list.to_vec())
            }
            "range" => range_list(do_list),
            "readLines" => return (offset, self.verb_read_lines(do_list, for_list)),
            "reverse" => Ok(do_list.iter().rev().cloned().collect()),
            "returnValue" => Ok(do_list.to_vec()),
            "set" => self.verb_set(do_list, for_list),
            "sort" => sort_list(do_list, for_list, typed == Typed::Int, desc),
            "split" => split_list(do_list, for_list),
            "time" => self.verb_time(do_list),
            "unique" => Ok(unique_list(do_list)),
            "writeLines" => return (offset, self.verb_write_lines(do_list, for_list)),
            _ => Ok(Vec::new()),
        };
        match result {
            Ok(p) => (offset, p),
            Err(e) => {
                self.fatal(&format!(
                    "{}: error when executing {} for {}",
                    e,
                    name,
                    do_list.join(" ")
                ));
                (offset, Vec::new())
            }
        }
    }

    /// Truth test: evaluate the do-list in single mode (a leading `int` /
    /// `float` token selects the typed evaluator) and advance by 1 when
    /// the result is positive, by the precomputed jump otherwise.
    fn verb_cond(&mut self, do_list: &[String], jump: i32) -> (i32, Vec<String>) {
        if do_list.is_empty() {
            self.fatal("condition is empty");
            return (jump, Vec::new());
        }
        let (etype, ops): (EvalType, &[String]) = match do_list[0].as_str() {
            "int" => (EvalType::Int, &do_list[1..]),
            "float" => (EvalType::Float, &do_list[1..]),
            _ => (EvalType::Str, do_list),
        };
        let (diag, stop, extended) = self.vm_parts();
        let p = vm::eval(Mode::Single, etype, ops, &[], &[], &[], extended, diag, stop);
        let mut offset = jump;
        if let Some(first) = p.first() {
            match num::parse_int(first) {
                Ok(res) => {
                    if res > 0 {
                        offset = 1;
                    }
                }
                Err(e) => self.fatal(&format!("{}: error when executing cond", e)),
            }
        }
        (offset, p)
    }

    /// Pair file operations with file names, cycling the shorter list.
    /// Only the last operation's result survives.
    fn verb_file(&mut self, do_list: &[String], for_list: &[String]) -> Vec<String> {
        let len = do_list.len();
        let flen = for_list.len();
        let mut p = Vec::new();
        if len > 0 && flen > 0 {
            let mut i = 0;
            let mut j = 0;
            while i < flen && j < len {
                p = self.fileop(&for_list[i], &do_list[j]);
                i += 1;
                j += 1;
                if i == flen && j < len {
                    i = 0;
                } else if i < flen && j == len {
                    j = 0;
                }
            }
        }
        p
    }

    fn fileop(&mut self, op: &str, filename: &str) -> Vec<String> {
        let path = self.resolve_path(filename);
        let mut result = Vec::new();
        match op {
            "delete" => {
                if !path.exists() {
                    result.push("1".to_string());
                } else if std::fs::remove_file(&path).is_ok() {
                    result.push("1".to_string());
                } else {
                    self.diag
                        .msg(Level::Error, &format!("file {} not deleted.", path.display()));
                    result.push("0".to_string());
                }
            }
            "exists" => {
                result.push(if path.exists() { "1" } else { "0" }.to_string());
            }
            "create" => {
                let _ = std::fs::File::create(&path);
                result = self.fileop("exists", filename);
            }
            "deletedir" => {
                if !path.exists() {
                    result.push("1".to_string());
                } else if !path.is_dir() {
                    result.push("1".to_string());
                    self.diag.msg(
                        Level::Error,
                        &format!("{} is not a directory - no deletion.", path.display()),
                    );
                } else if std::fs::remove_dir(&path).is_ok() {
                    result.push("1".to_string());
                } else {
                    result.push("0".to_string());
                    self.diag.msg(
                        Level::Error,
                        &format!("directory {} not deleted.", path.display()),
                    );
                }
            }
            "existsdir" => {
                result.push(if path.is_dir() { "1" } else { "0" }.to_string());
            }
            "createdir" => {
                let _ = std::fs::create_dir(&path);
                if path.is_dir() {
                    result.push("1".to_string());
                } else {
                    self.diag.msg(
                        Level::Error,
                        &format!("directory {} not created.", path.display()),
                    );
                    result.push("0".to_string());
                }
            }
            "listdir" => {
                let dir = if filename == "/" || filename == "./" {
                    self.curr_dir().to_path_buf()
                } else {
                    path
                };
                match std::fs::read_dir(&dir) {
                    Ok(entries) => {
                        for entry in entries.flatten() {
                            result.push(self.relativize(&entry.path()));
                        }
                    }
                    Err(e) => {
                        self.fatal(&format!(
                            "{}: could not execute {} on file {}",
                            e,
                            op,
                            dir.display()
                        ));
                    }
                }
            }
            _ => {}
        }
        result
    }

    /// Reduce an absolute path under the current directory to a relative one.
    fn relativize(&self, path: &Path) -> String {
        match path.strip_prefix(self.curr_dir()) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }

    fn verb_input(&mut self, do_list: &[String]) -> Vec<String> {
        let _ = self.write_output(&format!("{} ", do_list.join(" ")));
        self.flush_output();
        match self.read_input_line() {
            Ok(line) => vec![line.split_whitespace().next().unwrap_or("").to_string()],
            Err(e) => {
                self.fatal(&format!("{}: error when executing input", e));
                Vec::new()
            }
        }
    }

    fn verb_read_lines(&mut self, do_list: &[String], for_list: &[String]) -> Vec<String> {
        let mut keep_empty = false;
        let mut keep_eol = false;
        let mut keep_eof = false;
        for flag in for_list {
            match flag.as_str() {
                "keepEmpty" => keep_empty = true,
                "keepEol" => keep_eol = true,
                "keepEof" => keep_eof = true,
                _ => {}
            }
        }
        let Some(name) = do_list.first() else {
            self.fatal("file name missing for readLines");
            return Vec::new();
        };
        let path = self.resolve_path(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let mut p = Vec::new();
                for line in text.lines() {
                    if line.is_empty() && keep_empty {
                        p.push("<empty>".to_string());
                    } else {
                        p.push(line.to_string());
                    }
                    if keep_eol {
                        p.push("<eol>".to_string());
                    }
                }
                if keep_eof {
                    p.push("<eof>".to_string());
                }
                p
            }
            Err(e) => {
                self.fatal(&format!("{}: could not execute readLines on file {}", e, name));
                Vec::new()
            }
        }
    }

    fn verb_write_lines(&mut self, do_list: &[String], for_list: &[String]) -> Vec<String> {
        let Some(name) = for_list.first() else {
            self.fatal("file name missing for writeLines");
            return Vec::new();
        };
        let path = self.resolve_path(name);
        let mut text = String::new();
        for line in do_list {
            text.push_str(line);
            text.push('\n');
        }
        let ok = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .and_then(|mut f| std::io::Write::write_all(&mut f, text.as_bytes()))
            .is_ok();
        vec![if ok { "1" } else { "0" }.to_string()]
    }

    fn verb_set(
        &mut self,
        do_list: &[String],
        for_list: &[String],
    ) -> Result<Vec<String>, RuntimeError> {
        let mut result = do_list.to_vec();
        let mut i = 0;
        while i < for_list.len() {
            let ix = num::parse_int(&for_list[i])?;
            if i + 1 < for_list.len() {
                if ix > 0 && (ix as usize) <= result.len() {
                    result[ix as usize - 1] = for_list[i + 1].clone();
                }
            } else {
                self.diag
                    .msg(Level::Warn, "missing value for set was ignored");
            }
            i += 2;
        }
        Ok(result)
    }

    /// Date/time values and arithmetic. Format tokens are recognized by
    /// their placeholder characters and stick for the rest of the run.
    fn verb_time(&mut self, do_list: &[String]) -> Result<Vec<String>, RuntimeError> {
        let mut result: Vec<String> = Vec::new();
        for tv in do_list {
            if tv == "now" {
                result.push(self.datetime.now());
            } else if tv == "today" {
                result.push(self.datetime.today());
            } else if (tv == "+" || tv == "-") && result.len() >= 2 {
                let b = result.pop().unwrap_or_default();
                let a = result.pop().unwrap_or_default();
                let v = if tv == "+" {
                    self.datetime.add(&a, &b)?
                } else {
                    self.datetime.subtract(&a, &b)?
                };
                result.push(v);
            } else if tv.contains(['m', 'h', 's']) {
                self.datetime.set_time_format(tv);
            } else if tv.contains(['D', 'M', 'Y', 'C', 'W', 'w']) {
                self.datetime.set_date_format(tv);
            } else {
                result.push(tv.clone());
            }
        }
        Ok(result)
    }

    pub(crate) fn resolve_path(&self, name: &str) -> PathBuf {
        if name.contains(':') || name.contains('/') || name.contains('\\') {
            PathBuf::from(name)
        } else {
            self.curr_dir().join(name)
        }
    }
}

/// Delete by 1-based index list: keep every element whose position is
/// not named in the for-list.
pub(crate) fn del_list(do_list: &[String], for_list: &[String]) -> Vec<String> {
    let drop: HashSet<&str> = for_list.iter().map(|s| s.as_str()).collect();
    do_list
        .iter()
        .enumerate()
        .filter(|(i, _)| !drop.contains((i + 1).to_string().as_str()))
        .map(|(_, v)| v.clone())
        .collect()
}

/// Membership filter: 1-based positions of do-list elements present in
/// the for-list.
pub(crate) fn find_list(do_list: &[String], for_list: &[String]) -> Vec<String> {
    let wanted: HashSet<&str> = for_list.iter().map(|s| s.as_str()).collect();
    do_list
        .iter()
        .enumerate()
        .filter(|(_, v)| wanted.contains(v.as_str()))
        .map(|(i, _)| (i + 1).to_string())
        .collect()
}

/// Split every value into characters, dropping blanks and tabs.
pub(crate) fn expand_list(do_list: &[String]) -> Vec<String> {
    let mut p = Vec::new();
    for value in do_list {
        for c in value.chars() {
            if c != ' ' && c != '\t' {
                p.push(c.to_string());
            }
        }
    }
    p
}

/// Key/count pair operations. `unify` sums counts per key; `most` and
/// `least` keep the keys carrying the extreme count.
pub(crate) fn freq_list(
    do_list: &[String],
    for_list: &[String],
) -> Result<Vec<String>, RuntimeError> {
    let op = for_list
        .first()
        .ok_or_else(|| RuntimeError::Custom("operation missing for freq".to_string()))?;
    let pair = |i: usize| -> Result<(String, i64), RuntimeError> {
        let key = do_list[i].clone();
        let count = do_list.get(i + 1).ok_or(RuntimeError::IndexOutOfRange {
            index: (i + 1) as i64,
            len: do_list.len(),
        })?;
        Ok((key, num::parse_int(count)?))
    };
    let mut result = Vec::new();
    match op.as_str() {
        "unify" => {
            // First-seen order is kept for deterministic output.
            let mut order: Vec<String> = Vec::new();
            let mut counts: HashMap<String, i64> = HashMap::new();
            let mut i = 0;
            while i < do_list.len() {
                let (key, count) = pair(i)?;
                match counts.get_mut(&key) {
                    Some(total) => *total += count,
                    None => {
                        order.push(key.clone());
                        counts.insert(key, count);
                    }
                }
                i += 2;
            }
            for key in order {
                let total = counts.get(&key).copied().unwrap_or(0);
                result.push(key);
                result.push(total.to_string());
            }
        }
        "most" | "least" => {
            let most = op == "most";
            let mut best: i64 = 0;
            let mut keys: Vec<String> = Vec::new();
            let mut i = 0;
            while i < do_list.len() {
                let (key, count) = pair(i)?;
                let better = if most { count > best } else { count < best };
                if better || i == 0 {
                    best = count;
                    keys.clear();
                    keys.push(key);
                } else if count == best {
                    keys.push(key);
                }
                i += 2;
            }
            for key in keys {
                result.push(key);
                result.push(best.to_string());
            }
        }
        _ => {}
    }
    Ok(result)
}

/// Selection by 1-based index list; out-of-range indices are skipped.
pub(crate) fn get_list(
    do_list: &[String],
    for_list: &[String],
) -> Result<Vec<String>, RuntimeError> {
    let mut p = Vec::new();
    for f in for_list {
        let ix = num::parse_int(f)? - 1;
        if ix >= 0 && (ix as usize) < do_list.len() {
            p.push(do_list[ix as usize].clone());
        }
    }
    Ok(p)
}

/// Insert the tail of the for-list in front of the 0-based position
/// named by its head; past the end, the insertion lands after the list.
pub(crate) fn ins_list(
    do_list: &[String],
    for_list: &[String],
) -> Result<Vec<String>, RuntimeError> {
    let first = for_list
        .first()
        .ok_or_else(|| RuntimeError::Custom("insertion index missing for ins".to_string()))?;
    let ix = num::parse_int(first)?;
    let mut p = Vec::new();
    for (i, value) in do_list.iter().enumerate() {
        if ix == i as i64 {
            p.extend(for_list[1..].iter().cloned());
        }
        p.push(value.clone());
    }
    if ix >= do_list.len() as i64 {
        p.extend(for_list[1..].iter().cloned());
    }
    Ok(p)
}

pub(crate) fn join_list(do_list: &[String], for_list: &[String]) -> Vec<String> {
    if do_list.is_empty() {
        return Vec::new();
    }
    let sep = match for_list.first() {
        Some(s) if s == "#space" => " ".to_string(),
        Some(s) => s.clone(),
        None => String::new(),
    };
    vec![do_list.join(&sep)]
}

/// Repeat every do-list element by the matching count from the for-list,
/// cycling the counts independently of the main list's length.
pub(crate) fn mask_list(
    do_list: &[String],
    for_list: &[String],
) -> Result<Vec<String>, RuntimeError> {
    if do_list.is_empty() {
        return Ok(Vec::new());
    }
    if for_list.is_empty() {
        return Ok(do_list.to_vec());
    }
    let mut p = Vec::new();
    let mut cycle = 0usize;
    for value in do_list {
        let count = num::parse_int(&for_list[cycle])?;
        cycle = (cycle + 1) % for_list.len();
        for _ in 0..count.max(0) {
            p.push(value.clone());
        }
    }
    Ok(p)
}

/// Multiset difference: the for-list minus the do-list. Each do-list
/// occurrence cancels at most one matching for-list element.
pub(crate) fn minus_list(do_list: &[String], for_list: &[String]) -> Vec<String> {
    if for_list.is_empty() {
        return Vec::new();
    }
    if do_list.is_empty() {
        return for_list.to_vec();
    }
    let mut remaining = do_list.to_vec();
    let mut p = Vec::new();
    for value in for_list {
        if let Some(pos) = remaining.iter().position(|v| v == value) {
            remaining.remove(pos);
        } else {
            p.push(value.clone());
        }
    }
    p
}

/// Up to three from/to pairs producing a flattened cartesian product.
/// `*`, `+` and `-` take the previous dimension's value as base.
pub(crate) fn range_list(do_list: &[String]) -> Result<Vec<String>, RuntimeError> {
    let mut p = Vec::new();
    if do_list.len() < 2 {
        return Ok(p);
    }
    let up = range_directions(do_list)?;
    let first = range_values(&do_list[0], &do_list[1], "0", up[0])?;
    for f in &first {
        if do_list.len() >= 4 {
            let second = range_values(&do_list[2], &do_list[3], f, up[1])?;
            for s in &second {
                if do_list.len() >= 6 {
                    let third = range_values(&do_list[4], &do_list[5], s, up[2])?;
                    for t in &third {
                        p.push(f.clone());
                        p.push(s.clone());
                        p.push(t.clone());
                    }
                } else {
                    p.push(f.clone());
                    p.push(s.clone());
                }
            }
        } else {
            p.push(f.clone());
        }
    }
    Ok(p)
}

fn range_directions(do_list: &[String]) -> Result<[bool; 3], RuntimeError> {
    let mut up = [true; 3];
    let mut second_base = String::new();
    if do_list.len() >= 2 {
        up[0] = num::parse_int(&do_list[0])? <= num::parse_int(&do_list[1])?;
    }
    if do_list.len() >= 4 {
        let x = range_index(&do_list[2], &do_list[0])?;
        let y = range_index(&do_list[3], &do_list[0])?;
        second_base = x.to_string();
        up[1] = x <= y;
    }
    if do_list.len() >= 6 {
        let x = range_index(&do_list[4], &second_base)?;
        let y = range_index(&do_list[5], &second_base)?;
        up[2] = x <= y;
    }
    Ok(up)
}

fn range_index(r: &str, prev: &str) -> Result<i64, RuntimeError> {
    match r {
        "*" => num::parse_int(prev),
        "+" => Ok(num::parse_int(prev)? + 1),
        "-" => Ok(num::parse_int(prev)? - 1),
        _ => num::parse_int(r),
    }
}

fn range_values(from: &str, to: &str, prev: &str, up: bool) -> Result<Vec<String>, RuntimeError> {
    let x = range_index(from, prev)?;
    let y = range_index(to, prev)?;
    let mut result = Vec::new();
    if x <= y && up {
        for j in x..=y {
            result.push(j.to_string());
        }
    } else if x > y && !up {
        let mut j = x;
        while j >= y {
            result.push(j.to_string());
            j -= 1;
        }
    }
    Ok(result)
}

/// Sort with optional descending order, integer keys, and fixed-width
/// row grouping (`rows <key-index> <row-length>` in the for-list).
pub(crate) fn sort_list(
    do_list: &[String],
    for_list: &[String],
    int_keys: bool,
    desc_modifier: bool,
) -> Result<Vec<String>, RuntimeError> {
    let mut desc = desc_modifier;
    let mut rows: Option<(i64, i64)> = None;
    for (i, f) in for_list.iter().enumerate() {
        if f == "desc" {
            desc = true;
        } else if f == "rows" {
            let index = for_list.get(i + 1).ok_or_else(|| {
                RuntimeError::Custom("key index missing for sort rows".to_string())
            })?;
            let rowlen = for_list.get(i + 2).ok_or_else(|| {
                RuntimeError::Custom("row length missing for sort rows".to_string())
            })?;
            rows = Some((num::parse_int(index)?, num::parse_int(rowlen)?));
        }
    }

    if let Some((index, rowlen)) = rows {
        return sort_rows(do_list, index, rowlen, desc, int_keys);
    }

    let mut p = do_list.to_vec();
    if int_keys {
        let mut pairs: Vec<(i64, String)> = Vec::with_capacity(p.len());
        for v in p {
            pairs.push((num::parse_int(&v)?, v));
        }
        pairs.sort_by_key(|(k, _)| *k);
        if desc {
            pairs.reverse();
        }
        Ok(pairs.into_iter().map(|(_, v)| v).collect())
    } else {
        if desc {
            p.sort_by(|a, b| b.cmp(a));
        } else {
            p.sort();
        }
        Ok(p)
    }
}

/// Row-grouped sort keyed on one slot per row. Map semantics: a later
/// row with an already-seen key replaces the earlier one.
fn sort_rows(
    v: &[String],
    index: i64,
    rows: i64,
    desc: bool,
    int_keys: bool,
) -> Result<Vec<String>, RuntimeError> {
    if rows < 1 {
        return Err(RuntimeError::Custom(
            "row length must be positive for sort rows".to_string(),
        ));
    }
    let take_row = |i: usize| -> Result<(Vec<String>, String), RuntimeError> {
        let mut w = Vec::with_capacity(rows as usize);
        let mut key = String::new();
        for j in 0..rows as usize {
            let entry = v.get(i + j).ok_or(RuntimeError::IndexOutOfRange {
                index: (i + j) as i64,
                len: v.len(),
            })?;
            w.push(entry.clone());
            if j as i64 == index - 1 {
                key = entry.clone();
            }
        }
        Ok((w, key))
    };

    let mut p = Vec::new();
    if int_keys {
        let mut m: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        let mut i = 0;
        while i < v.len() {
            let (w, key) = take_row(i)?;
            m.insert(num::parse_int(&key)?, w);
            i += rows as usize;
        }
        if desc {
            for w in m.into_values().rev() {
                p.extend(w);
            }
        } else {
            for w in m.into_values() {
                p.extend(w);
            }
        }
    } else {
        let mut m: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut i = 0;
        while i < v.len() {
            let (w, key) = take_row(i)?;
            m.insert(key, w);
            i += rows as usize;
        }
        if desc {
            for w in m.into_values().rev() {
                p.extend(w);
            }
        } else {
            for w in m.into_values() {
                p.extend(w);
            }
        }
    }
    Ok(p)
}

/// Split each value on a single-character separator (`#space` for a
/// blank); with no separator, explode into characters.
pub(crate) fn split_list(
    do_list: &[String],
    for_list: &[String],
) -> Result<Vec<String>, RuntimeError> {
    if do_list.is_empty() {
        return Ok(Vec::new());
    }
    let mut p = Vec::new();
    match for_list.first() {
        Some(raw) => {
            let sep = if raw == "#space" { " " } else { raw.as_str() };
            let c = sep
                .chars()
                .next()
                .ok_or_else(|| RuntimeError::Custom("empty separator for split".to_string()))?;
            for value in do_list {
                for word in value.split(c) {
                    if !word.is_empty() {
                        p.push(word.to_string());
                    }
                }
            }
        }
        None => {
            for value in do_list {
                for c in value.chars() {
                    p.push(c.to_string());
                }
            }
        }
    }
    Ok(p)
}

/// Deduplicate, keeping first-seen order.
pub(crate) fn unique_list(do_list: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut p = Vec::new();
    for value in do_list {
        if seen.insert(value.clone()) {
            p.push(value.clone());
        }
    }
    p
}

/// Interleave the for-list into the do-list after every `stride`
/// elements (default 1); the final element is never followed by one.
pub(crate) fn between_list(
    do_list: &[String],
    for_list: &[String],
    use_list: &[String],
) -> Result<Vec<String>, RuntimeError> {
    if for_list.is_empty() {
        return Ok(do_list.to_vec());
    }
    if do_list.is_empty() {
        return Ok(Vec::new());
    }
    let stride = match use_list.first() {
        Some(u) => num::parse_int(u)?,
        None => 1,
    };
    let mut p = Vec::new();
    let mut count = 0;
    for value in &do_list[..do_list.len() - 1] {
        p.push(value.clone());
        count += 1;
        if stride == count {
            p.extend(for_list.iter().cloned());
            count = 0;
        }
    }
    p.push(do_list[do_list.len() - 1].clone());
    Ok(p)
}

/// Strip surrounding quotes and process backslash escapes the way the
/// `print` verb renders values.
pub(crate) fn unescape(text: &str) -> String {
    let mut r = text;
    if r.len() >= 2 && r.starts_with('"') && r.ends_with('"') {
        r = &r[1..r.len() - 1];
    }
    let mut out = String::new();
    let mut escaped = false;
    for c in r.chars() {
        if escaped {
            escaped = false;
            match c {
                'q' => out.push('"'),
                'n' => out.push('\n'),
                't' => out.push('\t'),
                other => out.push(other),
            }
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn del_removes_by_one_based_index() {
        let p = del_list(&strings(&["a", "b", "c"]), &strings(&["1", "3"]));
        assert_eq!(p, ["b"]);
    }

    #[test]
    fn find_reports_one_based_positions() {
        let p = find_list(&strings(&["x", "y", "x", "z"]), &strings(&["x", "z"]));
        assert_eq!(p, ["1", "3", "4"]);
    }

    #[test]
    fn get_selects_and_skips_out_of_range() {
        let p = get_list(&strings(&["a", "b", "c"]), &strings(&["3", "1", "9"])).unwrap();
        assert_eq!(p, ["c", "a"]);
    }

    #[test]
    fn ins_inserts_before_zero_based_position() {
        let p = ins_list(&strings(&["a", "b"]), &strings(&["1", "X", "Y"])).unwrap();
        assert_eq!(p, ["a", "X", "Y", "b"]);
    }

    #[test]
    fn ins_past_the_end_appends() {
        let p = ins_list(&strings(&["a", "b"]), &strings(&["5", "X"])).unwrap();
        assert_eq!(p, ["a", "b", "X"]);
    }

    #[test]
    fn mask_cycles_its_counts() {
        let p = mask_list(&strings(&["a", "b", "c"]), &strings(&["2", "0"])).unwrap();
        // Counts cycle 2,0,2 over the three values.
        assert_eq!(p, ["a", "a", "c", "c"]);
    }

    #[test]
    fn minus_is_for_minus_do_as_multiset() {
        let p = minus_list(&strings(&["b"]), &strings(&["a", "b", "b", "c"]));
        assert_eq!(p, ["a", "b", "c"]);
        // Empty do-list passes the for-list through.
        let p = minus_list(&[], &strings(&["a"]));
        assert_eq!(p, ["a"]);
    }

    #[test]
    fn unique_keeps_first_seen_order() {
        let p = unique_list(&strings(&["b", "a", "b", "c", "a"]));
        assert_eq!(p, ["b", "a", "c"]);
    }

    #[test]
    fn freq_unify_sums_counts_per_key() {
        let p = freq_list(
            &strings(&["a", "2", "b", "1", "a", "3"]),
            &strings(&["unify"]),
        )
        .unwrap();
        assert_eq!(p, ["a", "5", "b", "1"]);
    }

    #[test]
    fn freq_most_and_least_keep_tied_keys() {
        let list = strings(&["a", "2", "b", "5", "c", "5"]);
        let p = freq_list(&list, &strings(&["most"])).unwrap();
        assert_eq!(p, ["b", "5", "c", "5"]);
        let p = freq_list(&list, &strings(&["least"])).unwrap();
        assert_eq!(p, ["a", "2"]);
    }

    #[test]
    fn join_and_split_round() {
        let joined = join_list(&strings(&["a", "b"]), &strings(&[","]));
        assert_eq!(joined, ["a,b"]);
        let joined = join_list(&strings(&["a", "b"]), &strings(&["#space"]));
        assert_eq!(joined, ["a b"]);
        let split = split_list(&strings(&["a,b", "c"]), &strings(&[","])).unwrap();
        assert_eq!(split, ["a", "b", "c"]);
        let chars = split_list(&strings(&["ab"]), &[]).unwrap();
        assert_eq!(chars, ["a", "b"]);
    }

    #[test]
    fn expand_drops_blanks() {
        let p = expand_list(&strings(&["a b", "cd"]));
        assert_eq!(p, ["a", "b", "c", "d"]);
    }

    #[test]
    fn sort_lexicographic_and_typed() {
        let p = sort_list(&strings(&["3", "1", "2"]), &[], false, true).unwrap();
        assert_eq!(p, ["3", "2", "1"]);
        let p = sort_list(&strings(&["3", "1", "2"]), &[], true, false).unwrap();
        assert_eq!(p, ["1", "2", "3"]);
        // Lexicographic ordering puts "10" before "9".
        let p = sort_list(&strings(&["9", "10"]), &[], false, false).unwrap();
        assert_eq!(p, ["10", "9"]);
    }

    #[test]
    fn sort_desc_via_for_list() {
        let p = sort_list(&strings(&["a", "c", "b"]), &strings(&["desc"]), false, false).unwrap();
        assert_eq!(p, ["c", "b", "a"]);
    }

    #[test]
    fn sort_rows_groups_by_key_slot() {
        let data = strings(&["b", "2", "a", "1"]);
        let p = sort_list(&data, &strings(&["rows", "1", "2"]), false, false).unwrap();
        assert_eq!(p, ["a", "1", "b", "2"]);
    }

    #[test]
    fn sort_rows_last_key_wins() {
        let data = strings(&["a", "1", "a", "2"]);
        let p = sort_list(&data, &strings(&["rows", "1", "2"]), false, false).unwrap();
        assert_eq!(p, ["a", "2"]);
    }

    #[test]
    fn range_single_and_nested() {
        let p = range_list(&strings(&["1", "3"])).unwrap();
        assert_eq!(p, ["1", "2", "3"]);
        let p = range_list(&strings(&["3", "1"])).unwrap();
        assert_eq!(p, ["3", "2", "1"]);
        let p = range_list(&strings(&["1", "2", "1", "2"])).unwrap();
        assert_eq!(p, ["1", "1", "1", "2", "2", "1", "2", "2"]);
    }

    #[test]
    fn range_relative_markers() {
        // Second dimension runs from the first value to one above it.
        let p = range_list(&strings(&["1", "2", "*", "+"])).unwrap();
        assert_eq!(p, ["1", "1", "1", "2", "2", "2", "2", "3"]);
    }

    #[test]
    fn between_inserts_at_stride() {
        let p = between_list(&strings(&["a", "b", "c"]), &strings(&["-"]), &[]).unwrap();
        assert_eq!(p, ["a", "-", "b", "-", "c"]);
        let p = between_list(
            &strings(&["a", "b", "c", "d"]),
            &strings(&["-"]),
            &strings(&["2"]),
        )
        .unwrap();
        assert_eq!(p, ["a", "b", "-", "c", "d"]);
    }

    #[test]
    fn unescape_handles_quotes_and_escapes() {
        assert_eq!(unescape("\"hello world\""), "hello world");
        assert_eq!(unescape("a\\nb"), "a\nb");
        assert_eq!(unescape("a\\tb"), "a\tb");
        assert_eq!(unescape("say \\q hi \\q"), "say \" hi \"");
        assert_eq!(unescape("plain"), "plain");
    }
}
