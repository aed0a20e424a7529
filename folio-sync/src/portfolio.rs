//! The registry of entity collections.

use crate::collection::CachedCollection;
use crate::config::SyncConfig;
use crate::hook::EntityHook;
use folio_model::{
    About, BlogPost, Category, Certification, Contact, Entity, Hero, Project, Skill,
};
use folio_store::RemoteStore;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Access to the collection of entity `T`.
pub trait Provides<T: Entity> {
    fn collection(&self) -> &CachedCollection<T>;
}

/// One [`CachedCollection`] per entity, sharing a store and configuration.
///
/// Create it once at startup with [`Portfolio::init`] and hand out references
/// (or clones of individual collections) to views. [`Portfolio::teardown`]
/// closes every push channel.
pub struct Portfolio {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    hero: CachedCollection<Hero>,
    about: CachedCollection<About>,
    contact: CachedCollection<Contact>,
    skills: CachedCollection<Skill>,
    projects: CachedCollection<Project>,
    categories: CachedCollection<Category>,
    certifications: CachedCollection<Certification>,
    blog: CachedCollection<BlogPost>,
}

impl Portfolio {
    pub fn init(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        info!("Initializing portfolio collections on {} store", store.name());
        Self {
            hero: CachedCollection::new(Arc::clone(&store), config.clone()),
            about: CachedCollection::new(Arc::clone(&store), config.clone()),
            contact: CachedCollection::new(Arc::clone(&store), config.clone()),
            skills: CachedCollection::new(Arc::clone(&store), config.clone()),
            projects: CachedCollection::new(Arc::clone(&store), config.clone()),
            categories: CachedCollection::new(Arc::clone(&store), config.clone()),
            certifications: CachedCollection::new(Arc::clone(&store), config.clone()),
            blog: CachedCollection::new(Arc::clone(&store), config.clone()),
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn hero(&self) -> &CachedCollection<Hero> {
        &self.hero
    }

    pub fn about(&self) -> &CachedCollection<About> {
        &self.about
    }

    pub fn contact(&self) -> &CachedCollection<Contact> {
        &self.contact
    }

    pub fn skills(&self) -> &CachedCollection<Skill> {
        &self.skills
    }

    pub fn projects(&self) -> &CachedCollection<Project> {
        &self.projects
    }

    pub fn categories(&self) -> &CachedCollection<Category> {
        &self.categories
    }

    pub fn certifications(&self) -> &CachedCollection<Certification> {
        &self.certifications
    }

    pub fn blog(&self) -> &CachedCollection<BlogPost> {
        &self.blog
    }

    /// The collection of `T`, for generic callers.
    pub fn get<T: Entity>(&self) -> &CachedCollection<T>
    where
        Self: Provides<T>,
    {
        <Self as Provides<T>>::collection(self)
    }

    /// Mounts a new view hook on the collection of `T`.
    pub async fn hook<T: Entity>(&self) -> EntityHook<T>
    where
        Self: Provides<T>,
    {
        EntityHook::mount(self.get::<T>().clone()).await
    }

    /// Marks every cached snapshot stale.
    pub fn invalidate_all(&self) {
        self.hero.invalidate();
        self.about.invalidate();
        self.contact.invalidate();
        self.skills.invalidate();
        self.projects.invalidate();
        self.categories.invalidate();
        self.certifications.invalidate();
        self.blog.invalidate();
    }

    /// Drops every push callback and closes every change channel.
    pub fn teardown(&self) {
        self.hero.shutdown();
        self.about.shutdown();
        self.contact.shutdown();
        self.skills.shutdown();
        self.projects.shutdown();
        self.categories.shutdown();
        self.certifications.shutdown();
        self.blog.shutdown();
        info!("Portfolio torn down");
    }
}

impl fmt::Debug for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portfolio")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .finish()
    }
}

macro_rules! provides {
    ($($entity:ty => $field:ident),* $(,)?) => {
        $(
            impl Provides<$entity> for Portfolio {
                fn collection(&self) -> &CachedCollection<$entity> {
                    &self.$field
                }
            }
        )*
    };
}

provides! {
    Hero => hero,
    About => about,
    Contact => contact,
    Skill => skills,
    Project => projects,
    Category => categories,
    Certification => certifications,
    BlogPost => blog,
}
