//! Single-variable formula compiler for calibration tables.
//!
//! Scale-factor tables store their pt dependence as ROOT `TF1`-style
//! strings in one variable `x`, e.g.
//! `0.887973*((1.+(0.0523821*x))/(1.+(0.0460876*x)))`.
//!
//! Supported: `+ - * /`, unary minus, parentheses, scientific literals and
//! the functions `abs sqrt log log10 exp pow min max tanh`.

use haa_core::{Error, Result};

/// Maximum parenthesis/call nesting accepted by the parser.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    X,
    Neg(Box<Node>),
    Bin(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Log10,
    Exp,
    Pow,
    Min,
    Max,
    Tanh,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" | "fabs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "log10" => Func::Log10,
            "exp" => Func::Exp,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            "tanh" => Func::Tanh,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

/// A compiled `f(x)`.
#[derive(Debug, Clone)]
pub struct Formula {
    root: Node,
}

impl Formula {
    /// Parse and compile a formula string.
    pub fn compile(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut p = Parser { tokens: &tokens, pos: 0, depth: 0 };
        let root = p.expr()?;
        if let Some(t) = p.peek() {
            return Err(Error::Calibration(format!(
                "unexpected token {t:?} after formula '{input}'"
            )));
        }
        Ok(Self { root })
    }

    /// Evaluate at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        eval(&self.root, x)
    }
}

fn eval(n: &Node, x: f64) -> f64 {
    match n {
        Node::Const(c) => *c,
        Node::X => x,
        Node::Neg(a) => -eval(a, x),
        Node::Bin(op, a, b) => {
            let (l, r) = (eval(a, x), eval(b, x));
            match op {
                Op::Add => l + r,
                Op::Sub => l - r,
                Op::Mul => l * r,
                Op::Div => l / r,
            }
        }
        Node::Call(f, args) => {
            let a = eval(&args[0], x);
            match f {
                Func::Abs => a.abs(),
                Func::Sqrt => a.sqrt(),
                Func::Log => a.ln(),
                Func::Log10 => a.log10(),
                Func::Exp => a.exp(),
                Func::Tanh => a.tanh(),
                Func::Pow => a.powf(eval(&args[1], x)),
                Func::Min => a.min(eval(&args[1], x)),
                Func::Max => a.max(eval(&args[1], x)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Tok>> {
    let mut out = Vec::new();
    let mut it = input.char_indices().peekable();

    while let Some(&(start, c)) = it.peek() {
        match c {
            _ if c.is_whitespace() => {
                it.next();
            }
            '+' | '-' | '*' | '/' | '(' | ')' | ',' => {
                it.next();
                out.push(match c {
                    '+' => Tok::Plus,
                    '-' => Tok::Minus,
                    '*' => Tok::Star,
                    '/' => Tok::Slash,
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    _ => Tok::Comma,
                });
            }
            _ if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                let mut prev = ' ';
                while let Some(&(i, d)) = it.peek() {
                    let exp_sign = (d == '+' || d == '-') && (prev == 'e' || prev == 'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exp_sign {
                        end = i + d.len_utf8();
                        prev = d;
                        it.next();
                    } else {
                        break;
                    }
                }
                let s = &input[start..end];
                let v: f64 = s
                    .parse()
                    .map_err(|_| Error::Calibration(format!("invalid number '{s}' in formula")))?;
                out.push(Tok::Num(v));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, d)) = it.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        end = i + 1;
                        it.next();
                    } else {
                        break;
                    }
                }
                out.push(Tok::Ident(input[start..end].to_string()));
            }
            _ => {
                return Err(Error::Calibration(format!(
                    "unexpected character '{c}' in formula '{input}'"
                )));
            }
        }
    }
    Ok(out)
}

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, want: Tok) -> Result<()> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            got => Err(Error::Calibration(format!("expected {want:?}, got {got:?}"))),
        }
    }

    fn expr(&mut self) -> Result<Node> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::Calibration(format!("formula nested deeper than {MAX_DEPTH}")));
        }
        let node = self.sum();
        self.depth -= 1;
        node
    }

    // sum := term (('+' | '-') term)*
    fn sum(&mut self) -> Result<Node> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => Op::Add,
                Some(Tok::Minus) => Op::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Node> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => Op::Mul,
                Some(Tok::Slash) => Op::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // unary := ('+' | '-')* atom
    fn unary(&mut self) -> Result<Node> {
        let mut negate = false;
        loop {
            match self.peek() {
                Some(Tok::Minus) => negate = !negate,
                Some(Tok::Plus) => {}
                _ => break,
            }
            self.pos += 1;
        }
        let atom = self.atom()?;
        Ok(if negate { Node::Neg(Box::new(atom)) } else { atom })
    }

    fn atom(&mut self) -> Result<Node> {
        match self.next() {
            Some(Tok::Num(v)) => Ok(Node::Const(v)),
            Some(Tok::LParen) => {
                let e = self.expr()?;
                self.expect(Tok::RParen)?;
                Ok(e)
            }
            Some(Tok::Ident(name)) if matches!(self.peek(), Some(Tok::LParen)) => {
                let func = Func::lookup(&name)
                    .ok_or_else(|| Error::Calibration(format!("unknown function '{name}'")))?;
                self.pos += 1;
                let mut args = vec![self.expr()?];
                while matches!(self.peek(), Some(Tok::Comma)) {
                    self.pos += 1;
                    args.push(self.expr()?);
                }
                self.expect(Tok::RParen)?;
                if args.len() != func.arity() {
                    return Err(Error::Calibration(format!(
                        "'{name}' takes {} argument(s), got {}",
                        func.arity(),
                        args.len()
                    )));
                }
                Ok(Node::Call(func, args))
            }
            Some(Tok::Ident(name)) if name == "x" => Ok(Node::X),
            Some(Tok::Ident(name)) => {
                Err(Error::Calibration(format!("unknown variable '{name}' (only 'x' is allowed)")))
            }
            other => Err(Error::Calibration(format!(
                "expected number, 'x', function or '(', got {other:?}"
            ))),
        }
    }
}
