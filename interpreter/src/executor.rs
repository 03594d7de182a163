use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use prosa::Program;
use prosa::item::{Item, ItemKind};
use prosa::paragraph::Paragraph;

use crate::context::{Activation, StopScope, TERMINATE, decay};
use crate::context::{STOP_LOOP, STOP_PARAGRAPH, STOP_PROGRAM};
use crate::datetime::DateTimeFormats;
use crate::diag::{DiagSink, Level};
use crate::error::RuntimeError;
use crate::rowspec::{RowDefs, RowSlot};
use crate::vm::{self, EvalType, Mode};

/// Paragraph-call recursion bound.
const MAX_DEPTH: usize = 256;

/// Typed-evaluation selection from the `int`/`float` verb modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Typed {
    None,
    Int,
    Float,
}

impl Typed {
    pub(crate) fn eval_type(self) -> EvalType {
        match self {
            Typed::Int => EvalType::Int,
            Typed::Float => EvalType::Float,
            Typed::None => EvalType::Str,
        }
    }
}

/// How often the base verb runs per sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Plain,
    PerRow,
    Combine,
}

/// The execution engine. Walks paragraphs sentence by sentence using the
/// precomputed jump offsets, threading one Activation per paragraph call.
pub struct Interpreter<'a> {
    paragraphs: Vec<Paragraph>,
    names: HashMap<String, usize>,
    prog_args: Vec<String>,
    curr_dir: PathBuf,
    extended: bool,
    echo_log: bool,
    stop: i32,
    pub(crate) diag: DiagSink,
    pub(crate) datetime: DateTimeFormats,
    output: &'a mut dyn Write,
    input: Box<dyn BufRead + 'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        program: &Program,
        curr_dir: PathBuf,
        diag: DiagSink,
        output: &'a mut dyn Write,
    ) -> Interpreter<'a> {
        let mut names = HashMap::new();
        for (i, p) in program.paragraphs.iter().enumerate() {
            if !p.is_header() && !p.name().is_empty() {
                names.insert(p.name().to_string(), i);
            }
        }
        Interpreter {
            paragraphs: program.paragraphs.clone(),
            names,
            prog_args: Vec::new(),
            curr_dir,
            extended: false,
            echo_log: false,
            stop: 0,
            diag,
            datetime: DateTimeFormats::default(),
            output,
            input: Box::new(BufReader::new(std::io::stdin())),
        }
    }

    pub fn set_extended(&mut self, extended: bool) {
        self.extended = extended;
    }

    /// Mirror output/print/echo lines into the log sink.
    pub fn set_echo_log(&mut self, echo_log: bool) {
        self.echo_log = echo_log;
    }

    pub fn set_input(&mut self, input: Box<dyn BufRead + 'a>) {
        self.input = input;
    }

    pub fn had_fatal(&self) -> bool {
        self.diag.had_fatal()
    }

    pub fn stop_level(&self) -> i32 {
        self.stop
    }

    /// Run the program: paragraph 0 is the entry point and its `this`
    /// list is seeded from the program arguments.
    pub fn execute(&mut self, args: Vec<String>) -> i32 {
        if self.paragraphs.is_empty() {
            return 0;
        }
        self.prog_args = args.clone();
        let mut act = Activation::entry(args);
        self.exec_paragraph(0, &mut act);
        self.stop
    }

    /// Execute one paragraph activation and return the accumulated
    /// `returnValue` output.
    pub(crate) fn exec_paragraph(&mut self, index: usize, act: &mut Activation) -> Vec<String> {
        if self.stop > 0 {
            self.stop = decay(self.stop, StopScope::Paragraph);
            return act.this_list.clone();
        }
        self.diag.debug(&format!(
            "entering paragraph {} on level {}",
            index, act.stack_level
        ));
        let paragraph = self.paragraphs[index].clone();
        let mut totalrv: Vec<String> = Vec::new();
        let scmax = paragraph.len() as i32;
        let mut sc: i32 = 0;

        while sc >= 0 && sc < scmax {
            let sentence = &paragraph.sentences()[sc as usize];
            let do_list = self.resolve_params(&sentence.do_params, sc, act);
            let for_list = self.resolve_params(&sentence.for_params, sc, act);
            let use_list = self.resolve_params(&sentence.use_params, sc, act);
            let with_list = self.resolve_params(&sentence.with_params, sc, act);

            let verb = sentence.verb().clone();
            if verb.has_forget() {
                act.forget();
            }

            let (offset, out) =
                self.execute_verb(&verb, sentence.jump(), act, &do_list, &for_list, &use_list, &with_list);

            if verb.name() == "returnValue" {
                totalrv.extend(out.iter().cloned());
            }
            act.this_list = out;
            if sentence.is_saved() {
                act.cache.insert(sentence.seq(), act.this_list.clone());
            }

            if self.stop > 0 || offset <= TERMINATE {
                break;
            }
            sc += offset;
        }

        self.diag.debug(&format!("leaving paragraph {}", index));
        self.stop = decay(self.stop, StopScope::Paragraph);
        totalrv
    }

    /// Resolve one parameter channel: literals contribute their text,
    /// references resolve against the activation. Failures are reported
    /// and converted to a program stop; resolution continues degraded.
    fn resolve_params(&mut self, items: &[Item], sc: i32, act: &Activation) -> Vec<String> {
        let mut result = Vec::new();
        for item in items {
            match item.kind() {
                ItemKind::Plain => result.push(item.name().to_string()),
                ItemKind::Reference => match self.resolve_reference(item, sc, act) {
                    Ok(mut v) => result.append(&mut v),
                    Err(e) => self.fatal(&format!(
                        "{}: when processing reference {} in sentence {}",
                        e,
                        item.name(),
                        sc
                    )),
                },
                _ => {}
            }
        }
        result
    }

    fn resolve_reference(
        &self,
        item: &Item,
        sc: i32,
        act: &Activation,
    ) -> Result<Vec<String>, RuntimeError> {
        let from = item.ref_from();
        let to = item.ref_to();
        let base: &[String] = match item.name() {
            "this" => &act.this_list,
            "params" => &act.do_list,
            "forparams" => &act.for_list,
            "useparams" => &act.use_list,
            "withparams" => &act.with_list,
            "args" => &self.prog_args,
            _ => {
                let key = sc - (item.ref_distance() + 1);
                act.cache
                    .get(&key)
                    .ok_or(RuntimeError::MissingSentenceResult(key))?
            }
        };

        if item.has_get_size() {
            let size = base.len() as i64 + to as i64 - from as i64 + 1;
            return Ok(vec![size.to_string()]);
        }
        if from == 0 && to == -1 {
            return Ok(base.to_vec());
        }
        if from == to {
            let mut index = from as i64;
            if index < 0 {
                index += base.len() as i64;
            }
            let entry = index
                .try_into()
                .ok()
                .and_then(|ix: usize| base.get(ix))
                .ok_or(RuntimeError::IndexOutOfRange {
                    index,
                    len: base.len(),
                })?;
            return Ok(vec![entry.clone()]);
        }
        let mut v = base.to_vec();
        if from > 0 {
            let n = (from as usize).min(v.len());
            v.drain(..n);
        }
        if to < -1 {
            for _ in 1..-to {
                v.pop();
            }
        }
        Ok(v)
    }

    /// Read the modifier configuration off the verb and dispatch.
    pub(crate) fn execute_verb(
        &mut self,
        verb: &Item,
        jump: i32,
        act: &mut Activation,
        do_list: &[String],
        for_list: &[String],
        use_list: &[String],
        with_list: &[String],
    ) -> (i32, Vec<String>) {
        let name = verb.name().to_string();
        let mut typed = Typed::None;
        let mut repeat = Repeat::Plain;
        let mut desc = false;
        let mut echo_out = false;

        for part in verb.modifier_parts() {
            match part {
                "int" => {
                    typed = Typed::Int;
                    if name != "plist" && name != "sort" && name != "pexpr" {
                        self.diag.msg(
                            Level::Warn,
                            &format!("modifier int is ignored for verb {}.", name),
                        );
                    }
                }
                "float" => {
                    typed = Typed::Float;
                    if name != "plist" && name != "pexpr" {
                        self.diag.msg(
                            Level::Warn,
                            &format!("modifier float is ignored for verb {}.", name),
                        );
                    }
                }
                "desc" => {
                    desc = true;
                    if name != "sort" {
                        self.diag.msg(
                            Level::Warn,
                            &format!("modifier desc is ignored for verb {}.", name),
                        );
                    }
                }
                "echoIn" | "echo" => {
                    self.do_out(do_list);
                    self.echo_to_log(do_list);
                }
                "perRow" => repeat = Repeat::PerRow,
                "combine" => repeat = Repeat::Combine,
                _ => {}
            }
            if part == "echoOut" || part == "echo" {
                echo_out = true;
            }
        }

        let is_standard = verb.is_standard_verb();
        let (offset, p) = match repeat {
            Repeat::Plain => self.execute_plain_verb(
                &name, is_standard, jump, typed, desc, act, do_list, for_list, use_list, with_list,
            ),
            Repeat::PerRow => self.execute_per_row(
                &name, is_standard, typed, desc, act, do_list, for_list, use_list, with_list,
            ),
            Repeat::Combine => self.execute_combine(
                &name, is_standard, jump, typed, desc, act, do_list, for_list, use_list, with_list,
            ),
        };

        if echo_out {
            self.do_out(&p);
            self.echo_to_log(&p);
        }
        (offset, p)
    }

    /// One base-verb execution: standard, control, or paragraph call.
    fn execute_plain_verb(
        &mut self,
        name: &str,
        is_standard: bool,
        jump: i32,
        typed: Typed,
        desc: bool,
        act: &mut Activation,
        do_list: &[String],
        for_list: &[String],
        use_list: &[String],
        with_list: &[String],
    ) -> (i32, Vec<String>) {
        let mut offset = jump;
        let p: Vec<String>;

        if is_standard {
            let (off, out) = self.execute_standard_verb(name, typed, desc, do_list, for_list, offset);
            offset = off;
            p = out;
        } else {
            match name {
                "nop" => p = act.this_list.clone(),
                "stop" => {
                    offset = TERMINATE;
                    let mut level = STOP_LOOP;
                    if let Some(first) = do_list.first() {
                        if first == "program" {
                            level = STOP_PROGRAM;
                        } else if first == "paragraph" {
                            level = STOP_PARAGRAPH;
                        }
                    }
                    self.stop = level;
                    p = act.this_list.clone();
                }
                "between" => {
                    p = match crate::verbs::between_list(do_list, for_list, use_list) {
                        Ok(v) => v,
                        Err(e) => {
                            self.fatal(&format!("{}: error when executing between", e));
                            Vec::new()
                        }
                    }
                }
                "plist" => {
                    if for_list.is_empty() {
                        self.diag
                            .msg(Level::Warn, "initial forlist is empty for verb plist.");
                    }
                    let (diag, stop, extended) = self.vm_parts();
                    p = vm::eval(
                        Mode::Bulk,
                        typed.eval_type(),
                        do_list,
                        for_list,
                        use_list,
                        with_list,
                        extended,
                        diag,
                        stop,
                    );
                }
                _ => match self.names.get(name).copied() {
                    Some(index) => {
                        if act.stack_level + 1 > MAX_DEPTH {
                            self.fatal(&format!(
                                "paragraph call depth exceeded when calling {}",
                                name
                            ));
                            p = Vec::new();
                        } else {
                            let mut child = Activation::new(
                                act.this_list.clone(),
                                do_list.to_vec(),
                                for_list.to_vec(),
                                use_list.to_vec(),
                                with_list.to_vec(),
                                act.stack_level + 1,
                            );
                            p = self.exec_paragraph(index, &mut child);
                        }
                    }
                    None => {
                        self.fatal(&format!("paragraph {} does not exist", name));
                        p = Vec::new();
                    }
                },
            }
        }

        if is_standard && p.is_empty() && name != "returnValue" && name != "include" {
            self.diag.msg(
                Level::WarnAll,
                &format!("the output of standard verb {} is empty.", name),
            );
            self.diag.msg(
                Level::WarnAll,
                &format!("input dolist was {}", do_list.join(" ")),
            );
            self.diag.msg(
                Level::WarnAll,
                &format!("input forlist was {}", for_list.join(" ")),
            );
        }

        (offset, p)
    }

    /// Repeat the base verb once per fixed-width row drawn from the
    /// use-list, synthesizing each iteration's do-list from the declared
    /// row template.
    fn execute_per_row(
        &mut self,
        name: &str,
        is_standard: bool,
        typed: Typed,
        desc: bool,
        act: &mut Activation,
        do_list: &[String],
        for_list: &[String],
        use_list: &[String],
        with_list: &[String],
    ) -> (i32, Vec<String>) {
        let mut offset = 1;
        let mut result: Vec<String> = Vec::new();
        let uselen = use_list.len() as i64;
        if uselen == 0 {
            self.diag
                .msg(Level::Warn, "uselist is empty for modifier perRow.");
        }

        let (defs, warnings) = RowDefs::parse(do_list, self.extended);
        for w in warnings {
            self.diag.msg(Level::Error, &w);
        }
        if !defs.found_bar {
            self.fatal("no bar separator '|' found in perRow pattern");
            return (offset, result);
        }
        if defs.row_length < 1 {
            self.fatal("row length must be positive for perRow");
            return (offset, result);
        }
        let slots = defs.template(do_list, self.extended);
        result.extend(defs.inits.iter().cloned());

        let mut i: i64 = 0;
        while i < uselen {
            let mut row: Vec<String> = Vec::new();
            let mut off: i64 = 0;
            let mut empty_entries = 0;
            let mut valid = true;

            for slot in &slots {
                if let RowSlot::All = slot {
                    for j in i..i + defs.row_length {
                        if let Some(u) = use_list.get(j as usize) {
                            row.push(u.clone());
                        }
                    }
                    continue;
                }
                let entry: Option<String> = match slot {
                    RowSlot::Literal(text) => Some(text.clone()),
                    RowSlot::Next => {
                        if off >= defs.row_length {
                            off = 0;
                        }
                        if i + off < uselen {
                            let e = use_list[(i + off) as usize].clone();
                            off += 1;
                            Some(e)
                        } else if let Some(d) = &defs.def_use {
                            off += 1;
                            Some(d.clone())
                        } else {
                            None
                        }
                    }
                    RowSlot::UseAt(n) => {
                        let ix = i + n - 1;
                        if ix >= 0 && ix < uselen {
                            Some(use_list[ix as usize].clone())
                        } else {
                            defs.def_use.clone()
                        }
                    }
                    RowSlot::WithAt(n) => {
                        let ix = i + n - 1;
                        if ix >= 0 && (ix as usize) < with_list.len() {
                            Some(with_list[ix as usize].clone())
                        } else {
                            defs.def_with.clone()
                        }
                    }
                    RowSlot::ResultAt(n) => {
                        let ix = i + n - 1;
                        if ix >= 0 && (ix as usize) < result.len() {
                            Some(result[ix as usize].clone())
                        } else {
                            defs.def_result.clone()
                        }
                    }
                    RowSlot::Index => Some((i + 1).to_string()),
                    RowSlot::LastResult => result.last().cloned().or_else(|| defs.def_result.clone()),
                    RowSlot::All => None,
                };
                let Some(entry) = entry else {
                    row.clear();
                    valid = false;
                    self.diag.msg(
                        Level::WarnAll,
                        &format!("no valid result for {} in perRow.", name),
                    );
                    break;
                };
                if entry.is_empty() {
                    empty_entries += 1;
                } else {
                    row.push(entry);
                }
            }

            if empty_entries > 0 {
                self.diag.msg(
                    Level::WarnAll,
                    &format!(
                        "{} empty entries found. Possibly incomplete pattern for {}: {} was ignored.",
                        empty_entries,
                        name,
                        row.join(",")
                    ),
                );
                valid = false;
            }

            if valid {
                let p = if is_standard {
                    let (off, out) =
                        self.execute_standard_verb(name, typed, desc, &row, for_list, offset);
                    offset = off;
                    out
                } else if let Some(&index) = self.names.get(name) {
                    let mut child = Activation::new(
                        act.this_list.clone(),
                        row.clone(),
                        for_list.to_vec(),
                        use_list.to_vec(),
                        with_list.to_vec(),
                        0,
                    );
                    self.exec_paragraph(index, &mut child)
                } else {
                    self.fatal(&format!("verb not allowed for perRow or unknown: {}.", name));
                    Vec::new()
                };
                if p.is_empty() {
                    self.diag.msg(
                        Level::WarnAll,
                        &format!("empty result for {} in perRow - ignored.", name),
                    );
                } else {
                    result.extend(p);
                }
                if self.stop > 0 {
                    break;
                }
            }
            i += defs.row_length;
        }

        self.stop = decay(self.stop, StopScope::Loop);
        (offset, result)
    }

    /// Repeat the base verb, consuming one value per `#u`/`#f`/`#w`
    /// marker from the matching channel each iteration; unreferenced
    /// channels are passed through whole. Stops when any referenced
    /// channel runs dry.
    fn execute_combine(
        &mut self,
        name: &str,
        is_standard: bool,
        jump: i32,
        typed: Typed,
        desc: bool,
        act: &mut Activation,
        do_list: &[String],
        for_list: &[String],
        use_list: &[String],
        with_list: &[String],
    ) -> (i32, Vec<String>) {
        let mut offset = 1;
        let mut result: Vec<String> = Vec::new();
        let mut uoff = 0;
        let mut foff = 0;
        let mut woff = 0;
        let mut has_use = false;
        let mut has_for = false;
        let mut has_with = false;

        'rounds: loop {
            let mut row: Vec<String> = Vec::new();
            for token in do_list {
                match token.strip_prefix('#') {
                    Some("u") => {
                        if uoff < use_list.len() {
                            row.push(use_list[uoff].clone());
                            uoff += 1;
                            has_use = true;
                        } else {
                            break 'rounds;
                        }
                    }
                    Some("f") => {
                        if foff < for_list.len() {
                            row.push(for_list[foff].clone());
                            foff += 1;
                            has_for = true;
                        } else {
                            break 'rounds;
                        }
                    }
                    Some("w") => {
                        if woff < with_list.len() {
                            row.push(with_list[woff].clone());
                            woff += 1;
                            has_with = true;
                        } else {
                            break 'rounds;
                        }
                    }
                    // Other #-prefixed tokens are dropped.
                    Some(_) => {}
                    None => row.push(token.clone()),
                }
            }

            let fl: Vec<String> = if has_for { Vec::new() } else { for_list.to_vec() };
            let ul: Vec<String> = if has_use { Vec::new() } else { use_list.to_vec() };
            let wl: Vec<String> = if has_with { Vec::new() } else { with_list.to_vec() };
            let (off, p) = self.execute_plain_verb(
                name, is_standard, jump, typed, desc, act, &row, &fl, &ul, &wl,
            );
            offset = off;
            result.extend(p);

            if self.stop > 0 {
                break;
            }
        }

        self.stop = decay(self.stop, StopScope::Loop);
        (offset, result)
    }

    /// Report a fatal runtime condition and stop the program.
    pub(crate) fn fatal(&mut self, text: &str) {
        self.diag.msg(Level::Fatal, text);
        self.stop = STOP_PROGRAM;
    }

    pub(crate) fn vm_parts(&mut self) -> (&mut DiagSink, &mut i32, bool) {
        (&mut self.diag, &mut self.stop, self.extended)
    }

    pub(crate) fn curr_dir(&self) -> &Path {
        &self.curr_dir
    }

    /// Space-joined line to standard output.
    pub(crate) fn do_out(&mut self, v: &[String]) {
        for (i, s) in v.iter().enumerate() {
            if i > 0 {
                let _ = write!(self.output, " ");
            }
            let _ = write!(self.output, "{}", s);
        }
        let _ = writeln!(self.output);
    }

    /// Print with escape processing and no trailing newline; the blank
    /// separator is suppressed after a value that ended a line itself.
    pub(crate) fn do_print(&mut self, v: &[String]) {
        let mut suppress = false;
        for (i, raw) in v.iter().enumerate() {
            let s = crate::verbs::unescape(raw);
            if i > 0 && !suppress {
                let _ = write!(self.output, " ");
            }
            let _ = write!(self.output, "{}", s);
            suppress = s.ends_with('\n');
        }
    }

    pub(crate) fn echo_to_log(&mut self, v: &[String]) {
        if self.echo_log {
            self.diag.plain(&v.join(" "));
        }
    }

    pub(crate) fn write_output(&mut self, text: &str) -> std::io::Result<()> {
        write!(self.output, "{}", text)
    }

    pub(crate) fn flush_output(&mut self) {
        let _ = self.output.flush();
    }

    pub(crate) fn read_input_line(&mut self) -> Result<String, RuntimeError> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line)
    }
}
