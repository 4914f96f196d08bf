//! The opcode set the bytecode generator emits.
//!
//! Shortest-form selection (small integer constants, slot-specialized
//! argument/local access) is the emitter's job, so the short forms are
//! distinct variants here and tests can assert the exact encoding choice.

use crate::backend::{RtField, RtLabel, RtMethod, RtType};

#[derive(Clone, Debug, PartialEq)]
pub enum Il {
    Nop,
    Dup,
    Pop,

    // Integer constants
    /// `ldc.i4.m1` / `ldc.i4.0` ... `ldc.i4.8` (value in -1..=8).
    LdcI4Small(i8),
    /// `ldc.i4.s` (value in -128..=127).
    LdcI4S(i8),
    /// `ldc.i4` wide form.
    LdcI4(i32),
    Ldstr(String),
    Ldnull,

    // Arguments and locals
    /// `ldarg.0` ... `ldarg.3`.
    LdargN(u8),
    Ldarg(u16),
    Starg(u16),
    Ldarga(u16),
    /// `ldloc.0` ... `ldloc.3`.
    LdlocN(u8),
    Ldloc(u16),
    /// `stloc.0` ... `stloc.3`.
    StlocN(u8),
    Stloc(u16),
    Ldloca(u16),

    // Fields
    Ldfld(RtField),
    Ldflda(RtField),
    Stfld(RtField),
    Ldsfld(RtField),
    Ldsflda(RtField),
    Stsfld(RtField),

    // Indirect loads/stores (through a by-ref location)
    LdindI1,
    LdindU2,
    LdindI4,
    LdindRef,
    StindI1,
    StindI2,
    StindI4,
    StindRef,

    // Arithmetic / bitwise / shift
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    And,
    Or,
    Xor,
    Shl,
    Shr,

    // Comparison
    Ceq,
    Cgt,
    Clt,

    // Control flow
    Br(RtLabel),
    Brtrue(RtLabel),
    Brfalse(RtLabel),
    /// Branch out of a protected region.
    Leave(RtLabel),
    Ret,

    // Calls
    Call(RtMethod),
    Callvirt(RtMethod),
    Newobj(RtMethod),
    Ldftn(RtMethod),

    // Objects and arrays
    Box(RtType),
    Unbox(RtType),
    Castclass(RtType),
    Isinst(RtType),
    Ldtoken(RtType),
    Initobj(RtType),
    Ldobj(RtType),
    Stobj(RtType),
    Newarr(RtType),
    Ldlen,
    Ldelema(RtType),
    LdelemI1,
    LdelemU2,
    LdelemI4,
    LdelemRef,
    StelemI1,
    StelemI2,
    StelemI4,
    StelemRef,

    // Exceptions
    Throw,
    Rethrow,
}
