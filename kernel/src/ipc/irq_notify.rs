//! Delivery of hardware interrupts to userspace as IPC notifications
//!
//! A userspace driver registers an [`IrqCode`] script together with a
//! notification method number and the [`EndpointId`] of the answerbox that
//! should receive the notification. When the matching `inr` fires, every
//! registered handler's script runs in interrupt context until one of them
//! claims the interrupt; the claiming handler's captured register values are
//! packed into a notification and queued on its answerbox.
//!
//! This mirrors the split between [`crate::irq`] (architecture-facing
//! enable/disable/EOI) and the kernel-interpreted scripts used by real
//! microkernels to avoid running arbitrary driver code at IRQ time.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::{collections::VecDeque, vec::Vec};
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use super::capability::EndpointId;
use crate::irq::IrqNumber;

/// Device cookie used to disambiguate handlers sharing one `inr`.
///
/// `ANY` means the registrant doesn't care which device raised the line;
/// its claim predicate is expected to always accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevNo {
    Any,
    Id(u32),
}

/// A single step of a pre-interpreted IRQ script.
///
/// Scripts are deliberately tiny: a fixed sequence of port reads/writes plus
/// bitwise tests, so the kernel can execute untrusted driver-supplied code
/// safely at hard-IRQ time without a full interpreter.
#[derive(Debug, Clone, Copy)]
pub enum IrqInstruction {
    /// Read one byte from `port` into scratch register `dst`.
    ReadPortByte { port: u16, dst: usize },
    /// Read two bytes from `port` into scratch register `dst`.
    ReadPortWord { port: u16, dst: usize },
    /// Write the low byte of scratch register `src` to `port`.
    WritePortByte { port: u16, src: usize },
    /// AND scratch register `reg` with `mask` in place.
    AndImm { reg: usize, mask: u32 },
    /// Accept the interrupt unconditionally (used by `devno = ANY` scripts).
    Accept,
    /// Accept only if scratch register `reg` equals `value`.
    AcceptIfEqual { reg: usize, value: u32 },
    /// Decline (let the next handler in the chain try) if `reg` equals `value`.
    DeclineIfEqual { reg: usize, value: u32 },
}

/// Number of scratch registers available to an IRQ script.
pub const IRQ_CODE_REGISTERS: usize = 6;

/// A pre-registered sequence of port I/O steps executed at hard-IRQ time.
#[derive(Debug, Clone)]
pub struct IrqCode {
    #[cfg(feature = "alloc")]
    pub instructions: Vec<IrqInstruction>,
}

impl IrqCode {
    #[cfg(feature = "alloc")]
    pub fn new(instructions: Vec<IrqInstruction>) -> Self {
        Self { instructions }
    }

    /// Run the script, returning the claim outcome and the final register
    /// file (copied verbatim into the notification's argument words).
    #[cfg(feature = "alloc")]
    fn run(&self) -> (bool, [u64; IRQ_CODE_REGISTERS]) {
        let mut regs = [0u64; IRQ_CODE_REGISTERS];
        let mut claimed = false;

        for instr in &self.instructions {
            match *instr {
                IrqInstruction::ReadPortByte { port, dst } => {
                    if dst < IRQ_CODE_REGISTERS {
                        regs[dst] = read_port_byte(port) as u64;
                    }
                }
                IrqInstruction::ReadPortWord { port, dst } => {
                    if dst < IRQ_CODE_REGISTERS {
                        regs[dst] = read_port_word(port) as u64;
                    }
                }
                IrqInstruction::WritePortByte { port, src } => {
                    if src < IRQ_CODE_REGISTERS {
                        write_port_byte(port, regs[src] as u8);
                    }
                }
                IrqInstruction::AndImm { reg, mask } => {
                    if reg < IRQ_CODE_REGISTERS {
                        regs[reg] &= mask as u64;
                    }
                }
                IrqInstruction::Accept => claimed = true,
                IrqInstruction::AcceptIfEqual { reg, value } => {
                    if reg < IRQ_CODE_REGISTERS && regs[reg] == value as u64 {
                        claimed = true;
                    }
                }
                IrqInstruction::DeclineIfEqual { reg, value } => {
                    if reg < IRQ_CODE_REGISTERS && regs[reg] == value as u64 {
                        claimed = false;
                        break;
                    }
                }
            }
        }

        (claimed, regs)
    }
}

#[cfg(target_arch = "x86_64")]
fn read_port_byte(port: u16) -> u8 {
    // SAFETY: IRQ scripts are only installed for device I/O ports the
    // registering driver already has access to via sys_ipc_register_irq;
    // the port number is opaque to the kernel and carries no memory effect.
    unsafe { crate::arch::x86_64::inb(port) }
}

#[cfg(target_arch = "x86_64")]
fn read_port_word(port: u16) -> u16 {
    // SAFETY: see read_port_byte.
    unsafe { crate::arch::x86_64::inw(port) }
}

#[cfg(target_arch = "x86_64")]
fn write_port_byte(port: u16, value: u8) {
    // SAFETY: see read_port_byte.
    unsafe { crate::arch::x86_64::outb(port, value) }
}

#[cfg(not(target_arch = "x86_64"))]
fn read_port_byte(_port: u16) -> u8 {
    0
}

#[cfg(not(target_arch = "x86_64"))]
fn read_port_word(_port: u16) -> u16 {
    0
}

#[cfg(not(target_arch = "x86_64"))]
fn write_port_byte(_port: u16, _value: u8) {}

/// A single registered IRQ handler.
#[cfg(feature = "alloc")]
struct IrqRecord {
    devno: DevNo,
    code: IrqCode,
    method: u32,
    answerbox: EndpointId,
    /// Monotonically increasing registration id, used by unregister.
    handle: u64,
}

/// Notification queued on an answerbox's `irq_notifs` list.
///
/// Carries the captured register values in the same six-argument-word shape
/// used for ordinary calls so userspace handles both uniformly.
#[derive(Debug, Clone, Copy)]
pub struct IrqNotification {
    pub method: u32,
    pub args: [u64; IRQ_CODE_REGISTERS],
}

/// Bound on the number of queued-but-undelivered notifications per answerbox.
/// Chosen so a slow or stuck driver cannot grow kernel memory unboundedly;
/// once full the oldest entry is dropped and `lost` is latched.
const IRQ_NOTIF_QUEUE_CAP: usize = 256;

#[cfg(feature = "alloc")]
struct NotifQueue {
    pending: VecDeque<IrqNotification>,
    lost: bool,
}

#[cfg(feature = "alloc")]
impl NotifQueue {
    const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            lost: false,
        }
    }

    fn push(&mut self, notif: IrqNotification) {
        if self.pending.len() >= IRQ_NOTIF_QUEUE_CAP {
            self.pending.pop_front();
            self.lost = true;
        }
        self.pending.push_back(notif);
    }
}

#[cfg(feature = "alloc")]
struct IrqNotifyTable {
    /// Per-`inr` chain of handlers, walked in insertion order so that
    /// `devno = ANY` handlers registered earlier get first refusal.
    handlers: alloc::collections::BTreeMap<u32, Vec<IrqRecord>>,
    queues: alloc::collections::BTreeMap<EndpointId, NotifQueue>,
    next_handle: u64,
}

#[cfg(feature = "alloc")]
impl IrqNotifyTable {
    const fn new() -> Self {
        Self {
            handlers: alloc::collections::BTreeMap::new(),
            queues: alloc::collections::BTreeMap::new(),
            next_handle: 1,
        }
    }
}

#[cfg(feature = "alloc")]
static TABLE: Mutex<IrqNotifyTable> = Mutex::new(IrqNotifyTable::new());

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Register a userspace IRQ handler.
///
/// Corresponds to `sys_ipc_register_irq`. Returns an opaque handle used for
/// later `unregister_irq`.
#[cfg(feature = "alloc")]
pub fn register_irq(
    inr: IrqNumber,
    devno: DevNo,
    code: IrqCode,
    method: u32,
    answerbox: EndpointId,
) -> u64 {
    let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    let mut table = TABLE.lock();
    table
        .handlers
        .entry(inr.as_u32())
        .or_insert_with(Vec::new)
        .push(IrqRecord {
            devno,
            code,
            method,
            answerbox,
            handle,
        });
    table.queues.entry(answerbox).or_insert_with(NotifQueue::new);
    handle
}

/// Unregister a previously-registered IRQ handler by its handle.
///
/// Corresponds to `sys_ipc_unregister_irq`. Returns `true` if a handler was
/// found and removed.
#[cfg(feature = "alloc")]
pub fn unregister_irq(inr: IrqNumber, handle: u64) -> bool {
    let mut table = TABLE.lock();
    if let Some(chain) = table.handlers.get_mut(&inr.as_u32()) {
        let before = chain.len();
        chain.retain(|rec| rec.handle != handle);
        let removed = chain.len() != before;
        if chain.is_empty() {
            table.handlers.remove(&inr.as_u32());
        }
        removed
    } else {
        false
    }
}

/// Drop every handler owned by a dying task's answerbox.
///
/// Called from task teardown, mirroring the bulk hang-up performed for
/// phones connected to a destroyed answerbox.
#[cfg(feature = "alloc")]
pub fn hangup_answerbox(answerbox: EndpointId) {
    let mut table = TABLE.lock();
    for chain in table.handlers.values_mut() {
        chain.retain(|rec| rec.answerbox != answerbox);
    }
    table.handlers.retain(|_, chain| !chain.is_empty());
    table.queues.remove(&answerbox);
}

/// Entry point called from the architecture IRQ vector for `inr`.
///
/// Walks the handler chain in registration order; the first handler whose
/// script claims the interrupt (by devno match or unconditional accept)
/// wins and gets its notification queued. Remaining handlers are left
/// untouched -- only one claimant services a given interrupt occurrence.
/// Returns `true` if some handler claimed the interrupt.
#[cfg(feature = "alloc")]
pub fn dispatch_irq(inr: IrqNumber) -> bool {
    let mut table = TABLE.lock();
    let Some(chain) = table.handlers.get(&inr.as_u32()) else {
        return false;
    };

    for rec in chain {
        let (claimed, regs) = rec.code.run();
        if !claimed {
            continue;
        }
        // devno is informational here: the claim() script itself is what
        // decides ownership by reading the device's status register, so a
        // script that accepts has already disambiguated against its sibling
        // devno by construction.
        let _ = rec.devno;
        let notif = IrqNotification {
            method: rec.method,
            args: regs,
        };
        let answerbox = rec.answerbox;
        if let Some(queue) = table.queues.get_mut(&answerbox) {
            queue.push(notif);
        }
        return true;
    }
    false
}

/// Pop the oldest pending notification for an answerbox, if any.
///
/// Returns `(notification, lost)` where `lost` is `true` the first time a
/// notification was dropped for queue overflow since the last successful
/// pop, letting the driver resync exactly once per loss episode.
#[cfg(feature = "alloc")]
pub fn poll_notification(answerbox: EndpointId) -> Option<(IrqNotification, bool)> {
    let mut table = TABLE.lock();
    let queue = table.queues.get_mut(&answerbox)?;
    let notif = queue.pending.pop_front()?;
    let lost = queue.lost;
    queue.lost = false;
    Some((notif, lost))
}

/// `true` if the answerbox has at least one pending IRQ notification.
///
/// Used by the receive path to prefer the `irq_notifs` queue over the
/// ordinary `calls`/`answers` queues when both have data, matching the
/// "no ordering guarantee with regular calls, FIFO among themselves" rule.
#[cfg(feature = "alloc")]
pub fn has_pending(answerbox: EndpointId) -> bool {
    TABLE
        .lock()
        .queues
        .get(&answerbox)
        .is_some_and(|q| !q.pending.is_empty())
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;

    #[test]
    fn unconditional_accept_queues_notification() {
        let code = IrqCode::new(alloc::vec![IrqInstruction::Accept]);
        let handle = register_irq(IrqNumber::new(5), DevNo::Any, code, 100, 1);
        assert!(dispatch_irq(IrqNumber::new(5)));
        let (notif, lost) = poll_notification(1).expect("notification queued");
        assert_eq!(notif.method, 100);
        assert!(!lost);
        assert!(unregister_irq(IrqNumber::new(5), handle));
        assert!(!dispatch_irq(IrqNumber::new(5)));
    }

    #[test]
    fn chain_order_first_claim_wins() {
        let decline = IrqCode::new(alloc::vec![
            IrqInstruction::AndImm { reg: 0, mask: 0 },
            IrqInstruction::AcceptIfEqual { reg: 0, value: 1 },
        ]);
        let accept = IrqCode::new(alloc::vec![IrqInstruction::Accept]);
        register_irq(IrqNumber::new(6), DevNo::Any, decline, 1, 2);
        register_irq(IrqNumber::new(6), DevNo::Any, accept, 2, 3);
        assert!(dispatch_irq(IrqNumber::new(6)));
        assert!(poll_notification(2).is_none());
        let (notif, _) = poll_notification(3).expect("second handler claims");
        assert_eq!(notif.method, 2);
    }

    #[test]
    fn overflow_sets_lost_flag() {
        let code = IrqCode::new(alloc::vec![IrqInstruction::Accept]);
        register_irq(IrqNumber::new(7), DevNo::Any, code, 1, 4);
        for _ in 0..(IRQ_NOTIF_QUEUE_CAP + 1) {
            dispatch_irq(IrqNumber::new(7));
        }
        let mut lost_seen = false;
        while let Some((_, lost)) = poll_notification(4) {
            lost_seen |= lost;
        }
        assert!(lost_seen);
    }
}
