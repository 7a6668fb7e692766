//! # Eviction
//!
//! Escolha do slot a ser reaproveitado quando o bloco pedido não está no
//! cache.
//!
//! O scan lê `refcnt` e `recency` sem lock. O resultado é só um candidato:
//! `bget` revalida tudo com os buckets travados antes de reaproveitar o
//! slot e recomeça se o candidato deixou de ser válido.

use super::slot::{BufferSlot, SlotId};

/// Política de escolha de vítima.
pub trait EvictionPolicy: Send + Sync {
    /// Retorna um slot com `refcnt == 0`, ou `None` se todos estão em uso.
    fn select_victim(&self, slots: &[BufferSlot]) -> Option<SlotId>;
}

/// LRU aproximado por timestamp lógico.
///
/// Escolhe o slot sem referências com o menor `recency`. O `recency` só é
/// atualizado no bget e quando o refcnt chega a zero, não a cada acesso.
/// Empates: vence o primeiro slot encontrado no scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct LruTimestamp;

impl EvictionPolicy for LruTimestamp {
    fn select_victim(&self, slots: &[BufferSlot]) -> Option<SlotId> {
        let mut victim: Option<(SlotId, u64)> = None;

        for (index, slot) in slots.iter().enumerate() {
            if slot.ref_count() != 0 {
                continue;
            }
            let recency = slot.recency();
            match victim {
                Some((_, oldest)) if recency >= oldest => {}
                _ => victim = Some((SlotId::new(index), recency)),
            }
        }

        victim.map(|(id, _)| id)
    }
}
