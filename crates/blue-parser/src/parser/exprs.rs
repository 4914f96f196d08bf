//! Expression productions: the standard precedence tower.

use blue_common::SourceSpan;
use blue_scanner::{Kw, TokenKind};

use crate::ast::{
    ArgFlow, AssignExpr, BinOp, BinaryExpr, CallExpr, CastExpr, Expr, ExprKind, IncDecExpr,
    IndexExpr, MemberExpr, NameExpr, NewArrayExpr, NewExpr, TypeRef, UnOp,
};

use super::stmts::{expr_is_type_shape, expr_to_type_ref};
use super::Parser;

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Option<Expr> {
        let lhs = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            TokenKind::PercentAssign => Some(BinOp::Rem),
            TokenKind::AmpAssign => Some(BinOp::BitAnd),
            TokenKind::PipeAssign => Some(BinOp::BitOr),
            TokenKind::CaretAssign => Some(BinOp::BitXor),
            TokenKind::ShlAssign => Some(BinOp::Shl),
            TokenKind::ShrAssign => Some(BinOp::Shr),
            _ => return Some(lhs),
        };
        self.next();
        let rhs = self.parse_assign()?;
        let span = lhs.span.to(rhs.span);
        Some(Expr::new(
            span,
            ExprKind::Assign(AssignExpr {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                operator_method: None,
            }),
        ))
    }

    fn parse_conditional(&mut self) -> Option<Expr> {
        let cond = self.parse_or_or()?;
        if !self.eat(&TokenKind::Question) {
            return Some(cond);
        }
        let then_e = self.parse_expr()?;
        self.expect(&TokenKind::Colon, "':' in conditional expression")?;
        let else_e = self.parse_expr()?;
        let span = cond.span.to(else_e.span);
        Some(Expr::new(
            span,
            ExprKind::Cond {
                cond: Box::new(cond),
                then_e: Box::new(then_e),
                else_e: Box::new(else_e),
            },
        ))
    }

    fn binary(lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
        let span = lhs.span.to(rhs.span);
        Expr::new(
            span,
            ExprKind::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                operator_method: None,
            }),
        )
    }

    fn parse_or_or(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_and_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let rhs = self.parse_and_and()?;
            lhs = Self::binary(lhs, BinOp::OrOr, rhs);
        }
        Some(lhs)
    }

    fn parse_and_and(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_bit_or()?;
        while self.eat(&TokenKind::AmpAmp) {
            let rhs = self.parse_bit_or()?;
            lhs = Self::binary(lhs, BinOp::AndAnd, rhs);
        }
        Some(lhs)
    }

    fn parse_bit_or(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_bit_xor()?;
        while self.eat(&TokenKind::Pipe) {
            let rhs = self.parse_bit_xor()?;
            lhs = Self::binary(lhs, BinOp::BitOr, rhs);
        }
        Some(lhs)
    }

    fn parse_bit_xor(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_bit_and()?;
        while self.eat(&TokenKind::Caret) {
            let rhs = self.parse_bit_and()?;
            lhs = Self::binary(lhs, BinOp::BitXor, rhs);
        }
        Some(lhs)
    }

    fn parse_bit_and(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::Amp) {
            let rhs = self.parse_equality()?;
            lhs = Self::binary(lhs, BinOp::BitAnd, rhs);
        }
        Some(lhs)
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => return Some(lhs),
            };
            self.next();
            let rhs = self.parse_relational()?;
            lhs = Self::binary(lhs, op, rhs);
        }
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_shift()?;
        loop {
            match self.peek_kind() {
                TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
                    let op = match self.peek_kind() {
                        TokenKind::Lt => BinOp::Lt,
                        TokenKind::Gt => BinOp::Gt,
                        TokenKind::LtEq => BinOp::Le,
                        _ => BinOp::Ge,
                    };
                    self.next();
                    let rhs = self.parse_shift()?;
                    lhs = Self::binary(lhs, op, rhs);
                }
                TokenKind::Kw(Kw::Is) => {
                    self.next();
                    let ty = self.parse_type()?;
                    let span = lhs.span.to(ty.span);
                    lhs = Expr::new(
                        span,
                        ExprKind::Is {
                            expr: Box::new(lhs),
                            ty,
                        },
                    );
                }
                TokenKind::Kw(Kw::As) => {
                    self.next();
                    let ty = self.parse_type()?;
                    let span = lhs.span.to(ty.span);
                    lhs = Expr::new(
                        span,
                        ExprKind::As {
                            expr: Box::new(lhs),
                            ty,
                        },
                    );
                }
                _ => return Some(lhs),
            }
        }
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => return Some(lhs),
            };
            self.next();
            let rhs = self.parse_additive()?;
            lhs = Self::binary(lhs, op, rhs);
        }
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Some(lhs),
            };
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = Self::binary(lhs, op, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => return Some(lhs),
            };
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Self::binary(lhs, op, rhs);
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        match self.peek_kind() {
            TokenKind::Bang => {
                self.next();
                let expr = self.parse_unary()?;
                let span = start.to(expr.span);
                Some(Expr::new(
                    span,
                    ExprKind::Unary {
                        op: UnOp::Not,
                        expr: Box::new(expr),
                    },
                ))
            }
            TokenKind::Minus => {
                self.next();
                let expr = self.parse_unary()?;
                let span = start.to(expr.span);
                Some(Expr::new(
                    span,
                    ExprKind::Unary {
                        op: UnOp::Neg,
                        expr: Box::new(expr),
                    },
                ))
            }
            TokenKind::Plus => {
                self.next();
                self.parse_unary()
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let inc = self.at(&TokenKind::PlusPlus);
                self.next();
                let target = self.parse_unary()?;
                let span = start.to(target.span);
                Some(Expr::new(
                    span,
                    ExprKind::IncDec(IncDecExpr {
                        target: Box::new(target),
                        inc,
                        pre: true,
                    }),
                ))
            }
            TokenKind::LParen => self.parse_paren_or_cast(start),
            _ => self.parse_postfix(),
        }
    }

    /// Disambiguate `(T)x` casts from parenthesized expressions with one
    /// token of lookahead: parse the inside as an expression, then decide
    /// from what it turned out to be and what follows the `)`.
    fn parse_paren_or_cast(&mut self, start: SourceSpan) -> Option<Expr> {
        self.next(); // (
        if let TokenKind::Kw(
            kw @ (Kw::Int | Kw::Char | Kw::Bool | Kw::String | Kw::Object | Kw::Void),
        ) = self.peek_kind()
        {
            let kw_span = self.peek_span();
            self.next();
            if self.at(&TokenKind::Dot) {
                // `(int.Parse(...))` — the keyword begins an expression.
                let name = Expr::new(
                    kw_span,
                    ExprKind::Name(NameExpr {
                        name: kw.text().to_string(),
                        binding: None,
                    }),
                );
                let inner = self.parse_postfix_with(name)?;
                self.expect(&TokenKind::RParen, "')'")?;
                return self.parse_postfix_with(inner);
            }
            let ty = self.parse_rank_suffix(TypeRef::simple(kw_span, kw.text()));
            self.expect(&TokenKind::RParen, "')' closing the cast")?;
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            return Some(Expr::new(
                span,
                ExprKind::Cast(CastExpr {
                    ty,
                    expr: Box::new(operand),
                    kind: None,
                }),
            ));
        }

        let inner = self.parse_expr()?;
        if matches!(self.peek_kind(), TokenKind::ArrayRank(_)) && expr_is_type_shape(&inner) {
            let ty = self.parse_rank_suffix(expr_to_type_ref(&inner));
            self.expect(&TokenKind::RParen, "')' closing the cast")?;
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            return Some(Expr::new(
                span,
                ExprKind::Cast(CastExpr {
                    ty,
                    expr: Box::new(operand),
                    kind: None,
                }),
            ));
        }
        self.expect(&TokenKind::RParen, "')'")?;
        if expr_is_type_shape(&inner) && self.at_cast_operand_start() {
            let ty = expr_to_type_ref(&inner);
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            return Some(Expr::new(
                span,
                ExprKind::Cast(CastExpr {
                    ty,
                    expr: Box::new(operand),
                    kind: None,
                }),
            ));
        }
        self.parse_postfix_with(inner)
    }

    /// Tokens that may begin the operand of a cast. `-` is deliberately
    /// absent so `(x) - y` stays a subtraction.
    fn at_cast_operand_start(&mut self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Char(_)
                | TokenKind::Str(_)
                | TokenKind::Bool(_)
                | TokenKind::LParen
                | TokenKind::Bang
                | TokenKind::Kw(Kw::Null | Kw::This | Kw::Base | Kw::New | Kw::Typeof)
        )
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let primary = self.parse_primary()?;
        self.parse_postfix_with(primary)
    }

    fn parse_postfix_with(&mut self, mut expr: Expr) -> Option<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.next();
                    let (name, name_span) = self.expect_ident("a member name")?;
                    let span = expr.span.to(name_span);
                    expr = Expr::new(
                        span,
                        ExprKind::Member(MemberExpr {
                            target: Box::new(expr),
                            name,
                            binding: None,
                        }),
                    );
                }
                TokenKind::LParen => {
                    let args = self.parse_call_args()?;
                    let span = expr.span.to(self.peek_span());
                    expr = Expr::new(
                        span,
                        ExprKind::Call(CallExpr {
                            target: Box::new(expr),
                            args,
                            method: None,
                            polymorphic: true,
                        }),
                    );
                }
                TokenKind::LBracket => {
                    self.next();
                    let mut indices = Vec::new();
                    loop {
                        indices.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.peek_span();
                    self.expect(&TokenKind::RBracket, "']'")?;
                    let span = expr.span.to(end);
                    expr = Expr::new(
                        span,
                        ExprKind::Index(IndexExpr {
                            target: Box::new(expr),
                            indices,
                            is_array: false,
                            getter: None,
                            setter: None,
                        }),
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let inc = self.at(&TokenKind::PlusPlus);
                    let tok = self.next();
                    let span = expr.span.to(tok.span);
                    expr = Expr::new(
                        span,
                        ExprKind::IncDec(IncDecExpr {
                            target: Box::new(expr),
                            inc,
                            pre: false,
                        }),
                    );
                }
                _ => return Some(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.peek_span();
        match self.peek_kind() {
            TokenKind::Int(v) => {
                self.next();
                Some(Expr::new(span, ExprKind::Int(v)))
            }
            TokenKind::Char(c) => {
                self.next();
                Some(Expr::new(span, ExprKind::Char(c)))
            }
            TokenKind::Str(_) => {
                let tok = self.next();
                let TokenKind::Str(s) = tok.kind else {
                    unreachable!()
                };
                Some(Expr::new(span, ExprKind::Str(s)))
            }
            TokenKind::Bool(b) => {
                self.next();
                Some(Expr::new(span, ExprKind::Bool(b)))
            }
            TokenKind::Kw(Kw::Null) => {
                self.next();
                Some(Expr::new(span, ExprKind::Null))
            }
            TokenKind::Kw(Kw::This) => {
                self.next();
                Some(Expr::new(span, ExprKind::This))
            }
            TokenKind::Kw(Kw::Base) => {
                self.next();
                Some(Expr::new(span, ExprKind::Base))
            }
            TokenKind::Ident(_) => {
                let tok = self.next();
                let TokenKind::Ident(name) = tok.kind else {
                    unreachable!()
                };
                Some(Expr::new(
                    span,
                    ExprKind::Name(NameExpr {
                        name,
                        binding: None,
                    }),
                ))
            }
            TokenKind::Kw(kw @ (Kw::Int | Kw::Char | Kw::Bool | Kw::String | Kw::Object)) => {
                // Member access on a primitive alias, e.g. `int.Parse`.
                self.next();
                Some(Expr::new(
                    span,
                    ExprKind::Name(NameExpr {
                        name: kw.text().to_string(),
                        binding: None,
                    }),
                ))
            }
            TokenKind::Kw(Kw::New) => self.parse_new(span),
            TokenKind::Kw(Kw::Typeof) => {
                self.next();
                self.expect(&TokenKind::LParen, "'(' after 'typeof'")?;
                let ty = self.parse_type()?;
                let end = self.peek_span();
                self.expect(&TokenKind::RParen, "')' after type")?;
                Some(Expr::new(span.to(end), ExprKind::TypeOf { ty }))
            }
            _ => {
                self.error(span, "expected an expression");
                None
            }
        }
    }

    fn parse_new(&mut self, start: SourceSpan) -> Option<Expr> {
        self.next(); // new
        let base = self.parse_type_base()?;
        match self.peek_kind() {
            TokenKind::LParen => {
                let args = self.parse_call_args()?;
                let span = start.to(self.peek_span());
                Some(Expr::new(
                    span,
                    ExprKind::New(NewExpr {
                        ty: base,
                        args,
                        ctor: None,
                    }),
                ))
            }
            TokenKind::ArrayRank(rank) => {
                let tok = self.next();
                if rank > 1 {
                    self.not_yet_implemented(tok.span, "a multi-dimensional array");
                }
                let init = self.parse_array_initializer()?;
                let span = start.to(self.peek_span());
                Some(Expr::new(
                    span,
                    ExprKind::NewArray(NewArrayExpr {
                        elem: base,
                        rank,
                        len: None,
                        init: Some(init),
                    }),
                ))
            }
            TokenKind::LBracket => {
                self.next();
                let len = self.parse_expr()?;
                if self.at(&TokenKind::Comma) {
                    let span = self.peek_span();
                    self.not_yet_implemented(span, "a multi-dimensional array");
                    self.resync();
                    return None;
                }
                self.expect(&TokenKind::RBracket, "']' after array bound")?;
                let init = if self.at(&TokenKind::LBrace) {
                    Some(self.parse_array_initializer()?)
                } else {
                    None
                };
                let span = start.to(self.peek_span());
                Some(Expr::new(
                    span,
                    ExprKind::NewArray(NewArrayExpr {
                        elem: base,
                        rank: 1,
                        len: Some(Box::new(len)),
                        init,
                    }),
                ))
            }
            _ => {
                let span = self.peek_span();
                self.error(span, "expected '(' or '[' after the type in 'new'");
                None
            }
        }
    }

    fn parse_array_initializer(&mut self) -> Option<Vec<Expr>> {
        self.expect(&TokenKind::LBrace, "'{' opening array initializer")?;
        let mut items = Vec::new();
        if !self.at(&TokenKind::RBrace) {
            loop {
                items.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}' closing array initializer")?;
        Some(items)
    }

    pub(super) fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let start = self.peek_span();
                let arg = if self.eat_kw(Kw::Ref) {
                    let inner = self.parse_expr()?;
                    let span = start.to(inner.span);
                    Expr::new(
                        span,
                        ExprKind::Arg {
                            flow: ArgFlow::Ref,
                            expr: Box::new(inner),
                        },
                    )
                } else if self.eat_kw(Kw::Out) {
                    let inner = self.parse_expr()?;
                    let span = start.to(inner.span);
                    Expr::new(
                        span,
                        ExprKind::Arg {
                            flow: ArgFlow::Out,
                            expr: Box::new(inner),
                        },
                    )
                } else {
                    self.parse_expr()?
                };
                args.push(arg);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' closing arguments")?;
        Some(args)
    }
}
