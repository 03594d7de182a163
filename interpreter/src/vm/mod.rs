pub mod opcode;

use crate::context::STOP_PROGRAM;
use crate::diag::{DiagSink, Level};
use crate::error::RuntimeError;
use crate::num;
use opcode::{Op, Opcode};

/// Evaluation shape: one pass over the opcodes, or a sliding window
/// advanced across the data list by the declared stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Bulk,
}

/// The value domain the opcodes operate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalType {
    Int,
    Float,
    Str,
}

/// Tagged stack value. One evaluation runs homogeneous: every slot
/// matches the selected EvalType.
#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    fn render(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Float(d) => format!("{:.6}", d),
            Value::Str(s) => s.clone(),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i > 0,
            Value::Float(d) => *d > 0.0,
            Value::Str(s) => s != "0",
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Float(d) => *d == 0.0,
            Value::Str(s) => s == "0",
        }
    }
}

fn parse_value(etype: EvalType, text: &str) -> Result<Value, RuntimeError> {
    match etype {
        EvalType::Int => num::parse_int(text).map(Value::Int),
        EvalType::Float => num::parse_float(text).map(Value::Float),
        EvalType::Str => Ok(Value::Str(text.to_string())),
    }
}

fn vbool(etype: EvalType, b: bool) -> Value {
    match etype {
        EvalType::Int => Value::Int(if b { 1 } else { 0 }),
        EvalType::Float => Value::Float(if b { 1.0 } else { 0.0 }),
        EvalType::Str => Value::Str(if b { "1" } else { "0" }.to_string()),
    }
}

/// Integer power by repeated multiplication; a non-positive exponent
/// yields 1.
fn ipower(base: i64, exp: i64) -> i64 {
    let mut result: i64 = 1;
    let mut i = 1;
    while i <= exp {
        result = result.wrapping_mul(base);
        i += 1;
    }
    result
}

enum Flow {
    Continue,
    EndPosition,
    Skip(i64),
    Misuse(&'static str),
}

/// Evaluate a token list over a data list. Single mode is used by the
/// `cond` and `pexpr` verbs, bulk mode by `plist`. Errors are reported
/// through the sink and converted to a program-level stop; the partial
/// result produced so far is returned.
pub fn eval(
    mode: Mode,
    etype: EvalType,
    ops: &[String],
    data: &[String],
    use_list: &[String],
    with_list: &[String],
    extended: bool,
    diag: &mut DiagSink,
    stop: &mut i32,
) -> Vec<String> {
    let mut codes = match opcode::compile(ops, extended) {
        Ok(codes) => codes,
        Err(e) => {
            diag.msg(
                Level::Fatal,
                &format!("{}: error when compiling opcodes for {}", e, ops.join(" ")),
            );
            *stop = STOP_PROGRAM;
            return Vec::new();
        }
    };

    let bulk = mode == Mode::Bulk;
    let len: i64 = if bulk { data.len() as i64 } else { 1 };
    let mut incr: i64 = 1;
    let mut maxvar: i64 = if bulk { row_length(&codes) } else { 1 };
    let mut default: Option<Value> = None;

    // Row-stride and default declarations are consumed before the first
    // position and removed from the active sequence.
    while let Some(first) = codes.first() {
        if first.op != Op::Row && first.op != Op::Default {
            break;
        }
        if !bulk {
            diag.msg(Level::Error, "Opcodes row/def not allowed in pexpr.");
            return Vec::new();
        }
        if first.op == Op::Row {
            incr = first.left;
        } else {
            default = Some(match etype {
                EvalType::Int => Value::Int(first.left),
                EvalType::Float => Value::Float(first.left as f64),
                EvalType::Str => Value::Str(first.text.clone()),
            });
            maxvar = 1;
        }
        codes.remove(0);
    }

    let mut result: Vec<String> = Vec::new();
    let mut stack: Vec<Value> = Vec::new();
    let mut i: i64 = 0;
    'positions: while i <= len - maxvar {
        stack.clear();
        let mut j: i64 = 0;
        while j >= 0 && (j as usize) < codes.len() {
            let code = &codes[j as usize];
            if (stack.len() as u32) < code.operands {
                // A reducible binary operator over a single operand is
                // skipped; anything else aborts this position.
                let reducible = matches!(
                    code.op,
                    Op::And | Op::Or | Op::Plus | Op::Times | Op::Min | Op::Max
                );
                if !(stack.len() == 1 && reducible) {
                    diag.msg(
                        Level::Error,
                        &format!("not enough operands for Opcode {:?}", code.op),
                    );
                    *stop = STOP_PROGRAM;
                    break;
                }
            } else {
                match step(
                    code, etype, bulk, &mut stack, &mut result, data, use_list, with_list, i,
                    len, &default,
                ) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::EndPosition) => break,
                    Ok(Flow::Skip(n)) => j += n,
                    Ok(Flow::Misuse(name)) => {
                        diag.msg(
                            Level::Error,
                            &format!("Opcode {} not allowed in pexpr.", name),
                        );
                        return Vec::new();
                    }
                    Err(e) => {
                        diag.msg(
                            Level::Fatal,
                            &format!(
                                "{}: error when executing plist/pexpr for {}",
                                e,
                                ops.join(" ")
                            ),
                        );
                        *stop = STOP_PROGRAM;
                        break 'positions;
                    }
                }
            }
            j += 1;
        }
        i += incr;
    }

    if !stack.is_empty() {
        if bulk {
            diag.msg(
                Level::WarnAll,
                &format!("not all op results used for plist - {} left.", stack.len()),
            );
        } else {
            // Single mode: leftover stack values become the result.
            for v in &stack {
                result.push(v.render());
            }
        }
    }
    result
}

/// Highest var offset in the sequence; the window width in bulk mode.
fn row_length(codes: &[Opcode]) -> i64 {
    codes
        .iter()
        .filter(|c| c.op == Op::Var)
        .map(|c| c.left)
        .fold(1, i64::max)
}

fn pop(stack: &mut Vec<Value>) -> Value {
    stack.pop().expect("operand count checked before dispatch")
}

/// Apply one opcode. Opcodes the current value type cannot serve are
/// ignored without touching the stack.
fn step(
    code: &Opcode,
    etype: EvalType,
    bulk: bool,
    stack: &mut Vec<Value>,
    result: &mut Vec<String>,
    data: &[String],
    use_list: &[String],
    with_list: &[String],
    i: i64,
    len: i64,
    default: &Option<Value>,
) -> Result<Flow, RuntimeError> {
    match code.op {
        Op::And | Op::Or => {
            let r = pop(stack);
            let l = pop(stack);
            let b = if code.op == Op::And {
                l.truthy() && r.truthy()
            } else {
                l.truthy() || r.truthy()
            };
            stack.push(vbool(etype, b));
        }
        Op::Not => {
            let r = pop(stack);
            stack.push(vbool(etype, r.is_zero()));
        }
        Op::Abs => match pop_pair_type(etype, stack)? {
            Some(Numeric::Int(r)) => stack.push(Value::Int(r.wrapping_abs())),
            Some(Numeric::Float(r)) => stack.push(Value::Float(r.abs())),
            None => {}
        },
        Op::Plus | Op::Minus | Op::Times | Op::Divide | Op::Mod | Op::Power => {
            let r = pop(stack);
            let l = pop(stack);
            stack.push(arith(etype, code.op, l, r)?);
        }
        Op::Div => match etype {
            EvalType::Int => {
                let r = as_int(pop(stack))?;
                let l = as_int(pop(stack))?;
                if r == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                let rem = l % r;
                stack.push(Value::Int((l - rem) / r));
                stack.push(Value::Int(rem));
            }
            EvalType::Float => {
                let r = as_float(pop(stack))?;
                let l = as_float(pop(stack))?;
                if r.round() as i64 == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                let rem = ((l.round() as i64) % (r.round() as i64)) as f64;
                stack.push(Value::Float((l - rem) / r));
                stack.push(Value::Float(rem));
            }
            EvalType::Str => {}
        },
        Op::Min | Op::Max => {
            let r = pop(stack);
            let l = pop(stack);
            let keep_left = match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => {
                    if code.op == Op::Max { a > b } else { a < b }
                }
                (Value::Float(a), Value::Float(b)) => {
                    if code.op == Op::Max { a > b } else { a < b }
                }
                (Value::Str(a), Value::Str(b)) => {
                    if code.op == Op::Max { a > b } else { a < b }
                }
                _ => false,
            };
            stack.push(if keep_left { l } else { r });
        }
        Op::Eq | Op::Neq => {
            let r = pop(stack);
            let l = pop(stack);
            let eq = match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => a == b,
                (Value::Float(a), Value::Float(b)) => a == b,
                (Value::Str(a), Value::Str(b)) => a == b,
                _ => false,
            };
            stack.push(vbool(etype, if code.op == Op::Eq { eq } else { !eq }));
        }
        Op::Ge | Op::Le | Op::Gt | Op::Lt => {
            let r = pop(stack);
            let l = pop(stack);
            stack.push(vbool(etype, compare(code.op, &l, &r)?));
        }
        Op::Elvis => {
            let alt = pop(stack);
            let val = pop(stack);
            let cond = pop(stack);
            stack.push(if cond.truthy() { val } else { alt });
        }
        Op::Concat => match etype {
            EvalType::Str => {
                let r = as_str(pop(stack));
                let mut l = as_str(pop(stack));
                l.push_str(&r);
                stack.push(Value::Str(l));
            }
            _ => {}
        },
        Op::Len => match etype {
            EvalType::Str => {
                let r = as_str(pop(stack));
                stack.push(Value::Str(r.len().to_string()));
            }
            _ => {}
        },
        Op::IsInt => match etype {
            EvalType::Str => {
                let r = as_str(pop(stack));
                stack.push(vbool(etype, num::is_int(&r)));
            }
            _ => {}
        },
        Op::IsNum => match etype {
            EvalType::Str => {
                let r = as_str(pop(stack));
                stack.push(vbool(etype, num::is_number(&r)));
            }
            _ => {}
        },
        Op::Upper => match etype {
            EvalType::Str => {
                let r = as_str(pop(stack));
                stack.push(Value::Str(r.to_ascii_uppercase()));
            }
            _ => {}
        },
        Op::Lower => match etype {
            EvalType::Str => {
                let r = as_str(pop(stack));
                stack.push(Value::Str(r.to_ascii_lowercase()));
            }
            _ => {}
        },
        Op::Sqrt | Op::Ceil | Op::Floor | Op::Round | Op::Sin | Op::Cos | Op::Tan
        | Op::Arcsin | Op::Arccos | Op::Arctan | Op::Exp | Op::Log | Op::Log10 | Op::Sinh
        | Op::Cosh | Op::Tanh => match etype {
            EvalType::Float => {
                let r = as_float(pop(stack))?;
                let v = match code.op {
                    Op::Sqrt => r.sqrt(),
                    Op::Ceil => r.ceil(),
                    Op::Floor => r.floor(),
                    Op::Round => r.round(),
                    Op::Sin => r.sin(),
                    Op::Cos => r.cos(),
                    Op::Tan => r.tan(),
                    Op::Arcsin => r.asin(),
                    Op::Arccos => r.acos(),
                    Op::Arctan => r.atan(),
                    Op::Exp => r.exp(),
                    Op::Log => r.ln(),
                    Op::Log10 => r.log10(),
                    Op::Sinh => r.sinh(),
                    Op::Cosh => r.cosh(),
                    _ => r.tanh(),
                };
                stack.push(Value::Float(v));
            }
            _ => {}
        },
        Op::Val => stack.push(parse_value(etype, &code.text)?),
        Op::Var => {
            if !bulk {
                return Ok(Flow::Misuse("var"));
            }
            let index = i + code.left - 1;
            if let Some(def) = default {
                if index < 0 || index >= len {
                    stack.push(def.clone());
                } else {
                    stack.push(parse_value(etype, &data[index as usize])?);
                }
            } else {
                let entry = index
                    .try_into()
                    .ok()
                    .and_then(|ix: usize| data.get(ix))
                    .ok_or(RuntimeError::IndexOutOfRange {
                        index,
                        len: data.len(),
                    })?;
                stack.push(parse_value(etype, entry)?);
            }
        }
        Op::Idx => {
            if !bulk {
                return Ok(Flow::Misuse("idx"));
            }
            stack.push(match etype {
                EvalType::Int => Value::Int(i + 1),
                EvalType::Float => Value::Float((i + 1) as f64),
                EvalType::Str => Value::Str((i + 1).to_string()),
            });
        }
        Op::Uget | Op::Wget => {
            if !bulk {
                return Ok(Flow::Misuse(if code.op == Op::Uget { "uget" } else { "wget" }));
            }
            let list = if code.op == Op::Uget { use_list } else { with_list };
            let index = to_index(pop(stack))? - 1;
            let entry = index
                .try_into()
                .ok()
                .and_then(|ix: usize| list.get(ix))
                .ok_or(RuntimeError::IndexOutOfRange {
                    index,
                    len: list.len(),
                })?;
            stack.push(parse_value(etype, entry)?);
        }
        Op::Out => {
            if !bulk {
                return Ok(Flow::Misuse("out"));
            }
            let r = pop(stack);
            result.push(r.render());
        }
        Op::Drop => {
            pop(stack);
        }
        Op::End => return Ok(Flow::EndPosition),
        Op::Skipz => {
            let r = pop(stack);
            if r.is_zero() {
                return Ok(Flow::Skip(code.left));
            }
        }
        // Mid-sequence stride/default declarations have no effect.
        Op::Row | Op::Default => {}
    }
    Ok(Flow::Continue)
}

enum Numeric {
    Int(i64),
    Float(f64),
}

/// Pop a numeric operand for type-dependent unary arithmetic; None when
/// the current type does not serve the opcode.
fn pop_pair_type(etype: EvalType, stack: &mut Vec<Value>) -> Result<Option<Numeric>, RuntimeError> {
    match etype {
        EvalType::Int => Ok(Some(Numeric::Int(as_int(pop(stack))?))),
        EvalType::Float => Ok(Some(Numeric::Float(as_float(pop(stack))?))),
        EvalType::Str => Ok(None),
    }
}

fn as_int(v: Value) -> Result<i64, RuntimeError> {
    match v {
        Value::Int(i) => Ok(i),
        Value::Float(d) => Ok(d as i64),
        Value::Str(s) => num::parse_int(&s),
    }
}

fn as_float(v: Value) -> Result<f64, RuntimeError> {
    match v {
        Value::Int(i) => Ok(i as f64),
        Value::Float(d) => Ok(d),
        Value::Str(s) => num::parse_float(&s),
    }
}

fn as_str(v: Value) -> String {
    match v {
        Value::Str(s) => s,
        other => other.render(),
    }
}

fn to_index(v: Value) -> Result<i64, RuntimeError> {
    as_int(v)
}

fn arith(etype: EvalType, op: Op, l: Value, r: Value) -> Result<Value, RuntimeError> {
    match etype {
        EvalType::Float => {
            let a = as_float(l)?;
            let b = as_float(r)?;
            let v = match op {
                Op::Plus => a + b,
                Op::Minus => a - b,
                Op::Times => a * b,
                Op::Divide => a / b,
                Op::Mod => {
                    if b.round() as i64 == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    ((a.round() as i64) % (b.round() as i64)) as f64
                }
                _ => a.powf(b),
            };
            Ok(Value::Float(v))
        }
        // Int and Str both compute in i64; Str renders the result back.
        _ => {
            let a = as_int(l)?;
            let b = as_int(r)?;
            let v = match op {
                Op::Plus => a.wrapping_add(b),
                Op::Minus => a.wrapping_sub(b),
                Op::Times => a.wrapping_mul(b),
                Op::Divide => {
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    a / b
                }
                Op::Mod => {
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    a % b
                }
                _ => ipower(a, b),
            };
            Ok(match etype {
                EvalType::Int => Value::Int(v),
                _ => Value::Str(v.to_string()),
            })
        }
    }
}

/// Ordering comparisons. String mode compares numerically when both
/// operands are integral, lexicographically otherwise.
fn compare(op: Op, l: &Value, r: &Value) -> Result<bool, RuntimeError> {
    use std::cmp::Ordering;
    let ord = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => {
            a.partial_cmp(b).unwrap_or(Ordering::Greater)
        }
        (Value::Str(a), Value::Str(b)) => {
            if num::is_int(a) && num::is_int(b) {
                num::parse_int(a)?.cmp(&num::parse_int(b)?)
            } else {
                a.cmp(b)
            }
        }
        _ => Ordering::Equal,
    };
    Ok(match op {
        Op::Ge => ord != Ordering::Less,
        Op::Le => ord != Ordering::Greater,
        Op::Gt => ord == Ordering::Greater,
        _ => ord == Ordering::Less,
    })
}
