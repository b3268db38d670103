//! Collection ordonnée d'objets UPnP nommés.
//!
//! Les actions d'un service, leurs arguments et les variables d'état sont des
//! ensembles indexés par nom dont l'ordre d'insertion est significatif (l'ordre
//! des arguments vient du SCPD et doit être préservé sur le fil).

use std::collections::HashMap;
use std::sync::Arc;

/// Objet identifiable par un nom unique dans son ensemble.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectSetError {
    #[error("object '{0}' already exists in set")]
    AlreadyExists(String),
}

/// Ensemble ordonné nom → objet.
#[derive(Debug, Clone)]
pub struct ObjectSet<T: Named> {
    objects: HashMap<String, Arc<T>>,
    order: Vec<String>,
}

impl<T: Named> ObjectSet<T> {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn insert(&mut self, object: Arc<T>) -> Result<(), ObjectSetError> {
        let name = object.name().to_string();
        if self.objects.contains_key(&name) {
            return Err(ObjectSetError::AlreadyExists(name));
        }
        self.order.push(name.clone());
        self.objects.insert(name, object);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.objects.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Itère dans l'ordre d'insertion.
    pub fn iter(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.order.iter().filter_map(|name| self.get(name))
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }
}

impl<T: Named> Default for ObjectSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(String);

    impl Named for Item {
        fn name(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut set = ObjectSet::new();
        for name in ["zeta", "alpha", "mid"] {
            set.insert(Arc::new(Item(name.to_string()))).unwrap();
        }

        let names: Vec<_> = set.iter().map(|i| i.0.clone()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut set = ObjectSet::new();
        set.insert(Arc::new(Item("a".to_string()))).unwrap();
        assert!(matches!(
            set.insert(Arc::new(Item("a".to_string()))),
            Err(ObjectSetError::AlreadyExists(_))
        ));
    }
}
