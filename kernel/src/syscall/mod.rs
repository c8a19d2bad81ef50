//! System call interface for VeridianOS
//!
//! Provides the kernel-side implementation of system calls including IPC
//! operations.

#![allow(dead_code)]

use crate::ipc::{IpcError, SmallMessage};

mod process;
use process::*;

/// System call numbers
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    // IPC system calls
    IpcSend = 0,
    IpcReceive = 1,
    IpcCall = 2,
    IpcReply = 3,
    IpcCreateEndpoint = 4,
    IpcBindEndpoint = 5,
    IpcShareMemory = 6,
    IpcMapMemory = 7,

    // Process management
    ProcessYield = 10,
    ProcessExit = 11,
    ProcessFork = 12,
    ProcessExec = 13,
    ProcessWait = 14,
    ProcessGetPid = 15,
    ProcessGetPPid = 16,
    ProcessSetPriority = 17,
    ProcessGetPriority = 18,

    // Thread management
    ThreadCreate = 40,
    ThreadExit = 41,
    ThreadJoin = 42,
    ThreadGetTid = 43,
    ThreadSetAffinity = 44,
    ThreadGetAffinity = 45,

    // Memory management
    MemoryMap = 20,
    MemoryUnmap = 21,

    // Capability management
    CapabilityGrant = 30,
    CapabilityRevoke = 31,

    // IRQ notification registration
    IpcRegisterIrq = 50,
    IpcUnregisterIrq = 51,
}

/// System call result type
pub type SyscallResult = Result<usize, SyscallError>;

/// System call error codes
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    InvalidSyscall = -1,
    InvalidArgument = -2,
    PermissionDenied = -3,
    ResourceNotFound = -4,
    OutOfMemory = -5,
    WouldBlock = -6,
    Interrupted = -7,
}

impl From<IpcError> for SyscallError {
    fn from(err: IpcError) -> Self {
        match err {
            IpcError::InvalidCapability => SyscallError::PermissionDenied,
            IpcError::ProcessNotFound => SyscallError::ResourceNotFound,
            IpcError::EndpointNotFound => SyscallError::ResourceNotFound,
            IpcError::OutOfMemory => SyscallError::OutOfMemory,
            IpcError::WouldBlock => SyscallError::WouldBlock,
            IpcError::PermissionDenied => SyscallError::PermissionDenied,
            _ => SyscallError::InvalidArgument,
        }
    }
}

/// System call handler entry point
#[no_mangle]
pub extern "C" fn syscall_handler(
    syscall_num: usize,
    arg1: usize,
    arg2: usize,
    arg3: usize,
    arg4: usize,
    arg5: usize,
) -> isize {
    let result = match Syscall::try_from(syscall_num) {
        Ok(syscall) => handle_syscall(syscall, arg1, arg2, arg3, arg4, arg5),
        Err(_) => Err(SyscallError::InvalidSyscall),
    };

    match result {
        Ok(value) => value as isize,
        Err(error) => error as i32 as isize,
    }
}

/// Handle individual system calls
fn handle_syscall(
    syscall: Syscall,
    arg1: usize,
    arg2: usize,
    arg3: usize,
    arg4: usize,
    arg5: usize,
) -> SyscallResult {
    match syscall {
        // IPC system calls
        Syscall::IpcSend => sys_ipc_send(arg1, arg2, arg3, arg4),
        Syscall::IpcReceive => sys_ipc_receive(arg1, arg2),
        Syscall::IpcCall => sys_ipc_call(arg1, arg2, arg3, arg4, arg5),
        Syscall::IpcReply => sys_ipc_reply(arg1, arg2, arg3),

        // Process management
        Syscall::ProcessYield => sys_yield(),
        Syscall::ProcessExit => sys_exit(arg1),
        Syscall::ProcessFork => sys_fork(),
        Syscall::ProcessExec => sys_exec(arg1, arg2, arg3),
        Syscall::ProcessWait => sys_wait(arg1 as isize, arg2, arg3),
        Syscall::ProcessGetPid => sys_getpid(),
        Syscall::ProcessGetPPid => sys_getppid(),
        Syscall::ProcessSetPriority => sys_setpriority(arg1, arg2, arg3),
        Syscall::ProcessGetPriority => sys_getpriority(arg1, arg2),

        // Thread management
        Syscall::ThreadCreate => sys_thread_create(arg1, arg2, arg3, arg4),
        Syscall::ThreadExit => sys_thread_exit(arg1),
        Syscall::ThreadJoin => sys_thread_join(arg1, arg2),
        Syscall::ThreadGetTid => sys_gettid(),
        Syscall::ThreadSetAffinity => sys_thread_setaffinity(arg1, arg2, arg3),
        Syscall::ThreadGetAffinity => sys_thread_getaffinity(arg1, arg2, arg3),

        // IRQ notification registration
        Syscall::IpcRegisterIrq => {
            sys_ipc_register_irq(arg1, arg2, arg3, arg4, arg5)
        }
        Syscall::IpcUnregisterIrq => sys_ipc_unregister_irq(arg1, arg2),

        _ => Err(SyscallError::InvalidSyscall),
    }
}

/// IPC send system call
///
/// # Arguments
/// - capability: Capability token for the endpoint
/// - msg_ptr: Pointer to message structure
/// - msg_size: Size of message
/// - flags: Send flags
fn sys_ipc_send(
    _capability: usize,
    msg_ptr: usize,
    msg_size: usize,
    _flags: usize,
) -> SyscallResult {
    // Validate arguments
    if msg_ptr == 0 || msg_size == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // Check if this is a small message (fast path)
    if msg_size <= core::mem::size_of::<SmallMessage>() {
        // Fast path for small messages
        unsafe {
            let _msg = *(msg_ptr as *const SmallMessage);
            // TODO: Perform actual IPC send
            // This would involve:
            // 1. Validate capability
            // 2. Find target process
            // 3. Copy message to target
            // 4. Context switch if synchronous
        }
    } else {
        // Large message path
        // TODO: Handle large messages with shared memory
    }

    Ok(0)
}

/// IPC receive system call
///
/// # Arguments
/// - endpoint: Endpoint to receive from
/// - buffer: Buffer to receive message into
fn sys_ipc_receive(_endpoint: usize, buffer: usize) -> SyscallResult {
    if buffer == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // TODO: Implement receive
    // 1. Find endpoint
    // 2. Check for waiting messages
    // 3. If none, block current process
    // 4. Copy message to buffer when available

    Ok(0)
}

/// IPC call (send and wait for reply)
fn sys_ipc_call(
    _capability: usize,
    _send_msg: usize,
    _send_size: usize,
    _recv_buf: usize,
    _recv_size: usize,
) -> SyscallResult {
    // TODO: Implement call semantics
    // 1. Send message
    // 2. Block waiting for reply
    // 3. Return reply in recv_buf

    Ok(0)
}

/// IPC reply to a previous call
fn sys_ipc_reply(_caller: usize, _msg_ptr: usize, _msg_size: usize) -> SyscallResult {
    // TODO: Implement reply
    // 1. Validate caller is waiting for reply
    // 2. Copy reply message
    // 3. Wake up caller

    Ok(0)
}

/// Yield CPU to another process
fn sys_yield() -> SyscallResult {
    // TODO: Trigger scheduler
    Ok(0)
}

/// Raw, register-friendly encoding of one [`crate::ipc::IrqInstruction`] as
/// laid out by userspace when building an IRQ script for
/// [`sys_ipc_register_irq`].
#[repr(C)]
#[derive(Clone, Copy)]
struct RawIrqInstr {
    op: u32,
    a: u32,
    b: u32,
}

/// Maximum number of script instructions accepted from userspace in one
/// registration. Keeps a misbehaving driver from handing the kernel an
/// unbounded script to walk at hard-IRQ time.
const MAX_IRQ_CODE_LEN: usize = 32;

fn decode_irq_instr(raw: RawIrqInstr) -> Option<crate::ipc::IrqInstruction> {
    use crate::ipc::IrqInstruction::*;
    Some(match raw.op {
        0 => ReadPortByte {
            port: raw.a as u16,
            dst: raw.b as usize,
        },
        1 => ReadPortWord {
            port: raw.a as u16,
            dst: raw.b as usize,
        },
        2 => WritePortByte {
            port: raw.a as u16,
            src: raw.b as usize,
        },
        3 => AndImm {
            reg: raw.a as usize,
            mask: raw.b,
        },
        4 => Accept,
        5 => AcceptIfEqual {
            reg: raw.a as usize,
            value: raw.b,
        },
        6 => DeclineIfEqual {
            reg: raw.a as usize,
            value: raw.b,
        },
        _ => return None,
    })
}

/// Register a userspace IRQ handler (`sys_ipc_register_irq`).
///
/// # Arguments
/// - inr: interrupt number
/// - devno: device cookie, or `usize::MAX` for "any"
/// - req_ptr: pointer to a `u32` instruction count followed by that many
///   [`RawIrqInstr`] entries
/// - answerbox: endpoint id of the answerbox to notify
/// - method: notification method number delivered with each claim
///
/// Returns an opaque registration handle used by [`sys_ipc_unregister_irq`].
fn sys_ipc_register_irq(
    inr: usize,
    devno: usize,
    req_ptr: usize,
    answerbox: usize,
    method: usize,
) -> SyscallResult {
    if req_ptr == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    // SAFETY: req_ptr is taken on faith from the caller, matching the
    // validation level of the other fast-path IPC syscalls above; a bad
    // pointer here faults the calling thread rather than the kernel.
    let count = unsafe { *(req_ptr as *const u32) } as usize;
    if count > MAX_IRQ_CODE_LEN {
        return Err(SyscallError::InvalidArgument);
    }

    #[cfg(feature = "alloc")]
    {
        extern crate alloc;
        let mut instructions = alloc::vec::Vec::with_capacity(count);
        let entries_ptr = (req_ptr + core::mem::size_of::<u32>()) as *const RawIrqInstr;
        for i in 0..count {
            // SAFETY: see above; offset stays within the caller-declared count.
            let raw = unsafe { *entries_ptr.add(i) };
            match decode_irq_instr(raw) {
                Some(instr) => instructions.push(instr),
                None => return Err(SyscallError::InvalidArgument),
            }
        }

        let devno = if devno == usize::MAX {
            crate::ipc::DevNo::Any
        } else {
            crate::ipc::DevNo::Id(devno as u32)
        };

        let code = crate::ipc::IrqCode::new(instructions);
        let handle = crate::ipc::register_irq(
            crate::irq::IrqNumber::new(inr as u32),
            devno,
            code,
            method as u32,
            answerbox as u64,
        );
        Ok(handle as usize)
    }

    #[cfg(not(feature = "alloc"))]
    {
        let _ = (inr, devno, answerbox, method);
        Err(SyscallError::InvalidArgument)
    }
}

/// Unregister a previously-registered IRQ handler (`sys_ipc_unregister_irq`).
fn sys_ipc_unregister_irq(inr: usize, handle: usize) -> SyscallResult {
    #[cfg(feature = "alloc")]
    {
        if crate::ipc::unregister_irq(crate::irq::IrqNumber::new(inr as u32), handle as u64) {
            Ok(0)
        } else {
            Err(SyscallError::ResourceNotFound)
        }
    }

    #[cfg(not(feature = "alloc"))]
    {
        let _ = (inr, handle);
        Err(SyscallError::InvalidArgument)
    }
}

impl TryFrom<usize> for Syscall {
    type Error = ();

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            // IPC system calls
            0 => Ok(Syscall::IpcSend),
            1 => Ok(Syscall::IpcReceive),
            2 => Ok(Syscall::IpcCall),
            3 => Ok(Syscall::IpcReply),
            4 => Ok(Syscall::IpcCreateEndpoint),
            5 => Ok(Syscall::IpcBindEndpoint),
            6 => Ok(Syscall::IpcShareMemory),
            7 => Ok(Syscall::IpcMapMemory),

            // Process management
            10 => Ok(Syscall::ProcessYield),
            11 => Ok(Syscall::ProcessExit),
            12 => Ok(Syscall::ProcessFork),
            13 => Ok(Syscall::ProcessExec),
            14 => Ok(Syscall::ProcessWait),
            15 => Ok(Syscall::ProcessGetPid),
            16 => Ok(Syscall::ProcessGetPPid),
            17 => Ok(Syscall::ProcessSetPriority),
            18 => Ok(Syscall::ProcessGetPriority),

            // Memory management
            20 => Ok(Syscall::MemoryMap),
            21 => Ok(Syscall::MemoryUnmap),

            // Capability management
            30 => Ok(Syscall::CapabilityGrant),
            31 => Ok(Syscall::CapabilityRevoke),

            // Thread management
            40 => Ok(Syscall::ThreadCreate),
            41 => Ok(Syscall::ThreadExit),
            42 => Ok(Syscall::ThreadJoin),
            43 => Ok(Syscall::ThreadGetTid),
            44 => Ok(Syscall::ThreadSetAffinity),
            45 => Ok(Syscall::ThreadGetAffinity),

            // IRQ notification registration
            50 => Ok(Syscall::IpcRegisterIrq),
            51 => Ok(Syscall::IpcUnregisterIrq),

            _ => Err(()),
        }
    }
}
