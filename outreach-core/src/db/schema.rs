pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS prospects (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT,
    last_name TEXT,
    company TEXT,
    title TEXT,
    industry TEXT,
    phone TEXT,
    revenue_estimate TEXT,
    source TEXT NOT NULL DEFAULT 'manual',
    notes TEXT,
    sequence_step INTEGER NOT NULL DEFAULT 0 CHECK (sequence_step BETWEEN 0 AND 3),
    email_sent INTEGER NOT NULL DEFAULT 0,
    email_sent_at TEXT,
    replied INTEGER NOT NULL DEFAULT 0,
    replied_at TEXT,
    demo_booked INTEGER NOT NULL DEFAULT 0,
    demo_booked_at TEXT,
    became_client INTEGER NOT NULL DEFAULT 0,
    became_client_at TEXT,
    created_at TEXT NOT NULL,
    CHECK (email_sent = (sequence_step > 0)),
    CHECK (email_sent = (email_sent_at IS NOT NULL)),
    CHECK (replied = (replied_at IS NOT NULL)),
    CHECK (demo_booked = (demo_booked_at IS NOT NULL)),
    CHECK (became_client = (became_client_at IS NOT NULL))
);

CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    plan TEXT NOT NULL DEFAULT 'professional',
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'active', 'suspended', 'cancelled')),
    stripe_customer_id TEXT,
    stripe_subscription_id TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('member', 'admin', 'super_admin')),
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_prospects_due ON prospects(sequence_step, email_sent_at);
CREATE INDEX IF NOT EXISTS idx_prospects_source ON prospects(source);
CREATE INDEX IF NOT EXISTS idx_prospects_created ON prospects(created_at);
CREATE INDEX IF NOT EXISTS idx_users_organization ON users(organization_id);
"#;
