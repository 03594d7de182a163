use crate::error::RuntimeError;
use crate::num;

/// Opcodes shared by the three value types. Opcodes a type cannot serve
/// (transcendentals outside float mode, string functions outside string
/// mode) are ignored at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Row,
    Val,
    Var,
    Idx,
    And,
    Or,
    Not,
    Eq,
    Neq,
    Ge,
    Le,
    Gt,
    Lt,
    Elvis,
    Plus,
    Minus,
    Times,
    Divide,
    Abs,
    Power,
    Mod,
    Div,
    Min,
    Max,
    Out,
    Drop,
    Skipz,
    Default,
    Uget,
    Wget,
    Concat,
    Len,
    End,
    Sqrt,
    Ceil,
    Floor,
    Round,
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Exp,
    Log,
    Log10,
    Sinh,
    Cosh,
    Tanh,
    IsInt,
    IsNum,
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Opcode {
    pub op: Op,
    /// Numeric immediate: var offset, skip count, row stride, int default.
    pub left: i64,
    /// Text immediate: literal value, string default.
    pub text: String,
    pub operands: u32,
}

impl Opcode {
    fn plain(op: Op, operands: u32) -> Opcode {
        Opcode {
            op,
            left: 0,
            text: String::new(),
            operands,
        }
    }

    fn literal(text: impl Into<String>) -> Opcode {
        Opcode {
            op: Op::Val,
            left: 0,
            text: text.into(),
            operands: 0,
        }
    }
}

/// Compile a flat token list into an opcode sequence. A token matching
/// no operator is pushed as a literal value.
pub fn compile(tokens: &[String], extended: bool) -> Result<Vec<Opcode>, RuntimeError> {
    let mut result = Vec::with_capacity(tokens.len());
    for token in tokens {
        let code = token.as_str();
        let op = match code {
            "and" => Opcode::plain(Op::And, 2),
            "or" => Opcode::plain(Op::Or, 2),
            "?" => Opcode::plain(Op::Elvis, 3),
            "+" => Opcode::plain(Op::Plus, 2),
            "-" => Opcode::plain(Op::Minus, 2),
            "*" => Opcode::plain(Op::Times, 2),
            "/" => Opcode::plain(Op::Divide, 2),
            "&" => Opcode::plain(Op::Concat, 2),
            "pwr" => Opcode::plain(Op::Power, 2),
            "==" => Opcode::plain(Op::Eq, 2),
            "<>" => Opcode::plain(Op::Neq, 2),
            ">=" => Opcode::plain(Op::Ge, 2),
            "<=" => Opcode::plain(Op::Le, 2),
            ">" => Opcode::plain(Op::Gt, 2),
            "<" => Opcode::plain(Op::Lt, 2),
            "not" => Opcode::plain(Op::Not, 1),
            "len" => Opcode::plain(Op::Len, 1),
            "abs" => Opcode::plain(Op::Abs, 1),
            "sqrt" => Opcode::plain(Op::Sqrt, 1),
            "ceil" => Opcode::plain(Op::Ceil, 1),
            "floor" => Opcode::plain(Op::Floor, 1),
            "round" => Opcode::plain(Op::Round, 1),
            "sin" => Opcode::plain(Op::Sin, 1),
            "cos" => Opcode::plain(Op::Cos, 1),
            "tan" => Opcode::plain(Op::Tan, 1),
            "pi" => Opcode::literal("3.141592653589793"),
            "asin" => Opcode::plain(Op::Arcsin, 1),
            "acos" => Opcode::plain(Op::Arccos, 1),
            "atan" => Opcode::plain(Op::Arctan, 1),
            "exp" => Opcode::plain(Op::Exp, 1),
            "log" => Opcode::plain(Op::Log, 1),
            "log10" => Opcode::plain(Op::Log10, 1),
            "sinh" => Opcode::plain(Op::Sinh, 1),
            "cosh" => Opcode::plain(Op::Cosh, 1),
            "tanh" => Opcode::plain(Op::Tanh, 1),
            "out" => Opcode::plain(Op::Out, 1),
            "%" => Opcode::plain(Op::Mod, 2),
            "div" if extended => Opcode::plain(Op::Div, 2),
            "min" => Opcode::plain(Op::Min, 2),
            "max" => Opcode::plain(Op::Max, 2),
            "drop" => Opcode::plain(Op::Drop, 1),
            "end" => Opcode::plain(Op::End, 0),
            "uget" if extended => Opcode::plain(Op::Uget, 1),
            "wget" if extended => Opcode::plain(Op::Wget, 1),
            "isint" => Opcode::plain(Op::IsInt, 1),
            "isnum" => Opcode::plain(Op::IsNum, 1),
            "upper" => Opcode::plain(Op::Upper, 1),
            "lower" => Opcode::plain(Op::Lower, 1),
            _ => compile_prefixed(code)?,
        };
        result.push(op);
    }
    Ok(result)
}

fn compile_prefixed(code: &str) -> Result<Opcode, RuntimeError> {
    if let Some(suffix) = code.strip_prefix("row") {
        return Ok(Opcode {
            op: Op::Row,
            left: num::parse_int(suffix)?,
            text: String::new(),
            operands: 0,
        });
    }
    if let Some(suffix) = code.strip_prefix("skpz") {
        return Ok(Opcode {
            op: Op::Skipz,
            left: num::parse_int(suffix)?,
            text: String::new(),
            operands: 1,
        });
    }
    if let Some(suffix) = code.strip_prefix("val") {
        return Ok(Opcode::literal(suffix));
    }
    if code.starts_with("idx") {
        return Ok(Opcode::plain(Op::Idx, 0));
    }
    if let Some(suffix) = code.strip_prefix("var") {
        return Ok(Opcode {
            op: Op::Var,
            left: num::parse_int(suffix)?,
            text: String::new(),
            operands: 0,
        });
    }
    if let Some(suffix) = code.strip_prefix("def") {
        if num::is_int(suffix) {
            return Ok(Opcode {
                op: Op::Default,
                left: num::parse_int(suffix)?,
                text: suffix.to_string(),
                operands: 0,
            });
        }
        // A non-integer default is not a declaration: keep the token.
        return Ok(Opcode::literal(code));
    }
    // Anything else is a value pushed on the stack.
    Ok(Opcode::literal(code))
}
